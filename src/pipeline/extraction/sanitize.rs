//! Deterministic cleanup applied after every extraction stage.
//!
//! Order: ligature expansion, line breaks to spaces, whitespace collapse,
//! charset restriction, then a final collapse so dropped characters never
//! leave doubled or edge spaces behind.

use std::collections::BTreeSet;

/// Accented letters kept by default (Polish, both cases).
pub const POLISH_LETTERS: &str = "ĄąĆćĘęŁłŃńÓóŚśŹźŻż";

/// Typographic ligatures emitted by PDF producers and their letter sequences.
const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Expand single-glyph ligatures into their letters.
pub fn expand_ligatures(text: &str) -> String {
    if !text.chars().any(is_ligature) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match LIGATURES.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, letters)) => out.push_str(letters),
            None => out.push(c),
        }
    }
    out
}

fn is_ligature(c: char) -> bool {
    ('\u{FB00}'..='\u{FB06}').contains(&c)
}

/// Text cleanup with a configurable set of non-ASCII characters to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNormalizer {
    allowed: BTreeSet<char>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::with_allowed_chars(POLISH_LETTERS)
    }
}

impl TextNormalizer {
    /// Keep printable ASCII plus exactly the characters in `allowed`.
    pub fn with_allowed_chars(allowed: &str) -> Self {
        Self {
            allowed: allowed.chars().filter(|c| !c.is_ascii()).collect(),
        }
    }

    /// Extend the allow-list, e.g. with French or German letters.
    pub fn with_extra_chars(mut self, extra: &str) -> Self {
        self.allowed.extend(extra.chars().filter(|c| !c.is_ascii()));
        self
    }

    pub fn allowed_chars(&self) -> String {
        self.allowed.iter().collect()
    }

    pub fn normalize(&self, raw: &str) -> String {
        let expanded = expand_ligatures(raw);
        let unbroken = expanded.replace(['\r', '\n'], " ");
        let collapsed = collapse_whitespace(&unbroken);
        let restricted: String = collapsed.chars().filter(|c| self.is_kept(*c)).collect();
        collapse_whitespace(&restricted)
    }

    fn is_kept(&self, c: char) -> bool {
        matches!(c, ' '..='~') || self.allowed.contains(&c)
    }
}

/// Normalize with the default (Polish) allow-list.
pub fn normalize(raw: &str) -> String {
    TextNormalizer::default().normalize(raw)
}

/// Collapse every whitespace run into one space and trim both ends.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

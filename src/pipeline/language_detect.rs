//! Lightweight language detection for extracted text.
//!
//! Scores function words per language and adds a bonus for letters that
//! only one of the supported languages uses. Good enough to pick a prompt
//! language and tag an indexed document; not a general-purpose detector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Below this many trimmed characters the guess is `Unknown`.
pub const MIN_DETECTABLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "pl")]
    Polish,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    Unknown,
}

impl Language {
    /// ISO 639-1 code, or `unknown`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Polish => "pl",
            Self::English => "en",
            Self::German => "de",
            Self::French => "fr",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "pl" => Self::Polish,
            "en" => Self::English,
            "de" => Self::German,
            "fr" => Self::French,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const POLISH_WORDS: &[&str] = &[
    "i", "w", "z", "na", "nie", "się", "jest", "do", "że", "to", "dla", "oraz", "jak",
    "przez", "od", "po", "są", "który", "która", "które", "lub", "ale", "tak", "ten",
    "ta", "czy", "być", "został", "została", "roku", "pan", "pani",
];

const ENGLISH_WORDS: &[&str] = &[
    "the", "and", "was", "for", "are", "but", "not", "you", "all", "can", "her", "has",
    "his", "how", "its", "may", "our", "out", "who", "did", "get", "been", "from",
    "have", "this", "that", "with", "they", "will", "which", "would", "there", "is",
    "of", "to", "in",
];

const GERMAN_WORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "nicht", "mit", "ein", "eine", "für", "auf",
    "den", "von", "zu", "sich", "auch", "werden", "wird", "im", "dem", "des", "bei",
    "nach", "wir", "sie", "oder", "aus", "über",
];

const FRENCH_WORDS: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "du", "de", "et", "est", "en", "au", "aux",
    "pour", "par", "sur", "dans", "avec", "qui", "que", "pas", "son", "ses", "mais",
    "ou", "ce", "cette", "nous", "vous", "sont",
];

/// French elisions such as `l'`, `d'`, `qu'`.
const FRENCH_ELISIONS: &[&str] = &["d'", "l'", "n'", "s'", "qu'", "j'", "c'"];

/// Detect the primary language of a text.
///
/// Ties go to the earlier language in the order Polish, English, German,
/// French. Text with no signal at all is `Unknown`.
pub fn detect_language(text: &str) -> Language {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_DETECTABLE_CHARS {
        return Language::Unknown;
    }

    let lower = trimmed.to_lowercase();
    let (polish_letters, german_letters, french_letters) = count_distinctive_letters(&lower);

    let mut scores = [
        (Language::Polish, polish_letters / 2),
        (Language::English, 0),
        (Language::German, german_letters / 2),
        (Language::French, french_letters / 2),
    ];

    for word in lower.split(|c: char| !(c.is_alphanumeric() || c == '\'')) {
        if word.is_empty() {
            continue;
        }
        if POLISH_WORDS.contains(&word) {
            scores[0].1 += 1;
        }
        if ENGLISH_WORDS.contains(&word) {
            scores[1].1 += 1;
        }
        if GERMAN_WORDS.contains(&word) {
            scores[2].1 += 1;
        }
        if FRENCH_WORDS.contains(&word) || FRENCH_ELISIONS.iter().any(|e| word.starts_with(e)) {
            scores[3].1 += 1;
        }
    }

    let mut best = (Language::Unknown, 0u32);
    for (language, score) in scores {
        if score > best.1 {
            best = (language, score);
        }
    }

    if best.1 == 0 {
        return fallback_by_letters(polish_letters, german_letters, french_letters);
    }
    best.0
}

/// Single distinctive letters still say something when no word matched.
fn fallback_by_letters(polish: u32, german: u32, french: u32) -> Language {
    if polish > 0 {
        Language::Polish
    } else if german > 0 {
        Language::German
    } else if french > 0 {
        Language::French
    } else {
        Language::Unknown
    }
}

/// Count letters specific to Polish, German and French respectively.
fn count_distinctive_letters(lower_text: &str) -> (u32, u32, u32) {
    let mut polish = 0u32;
    let mut german = 0u32;
    let mut french = 0u32;
    for ch in lower_text.chars() {
        match ch {
            'ą' | 'ć' | 'ę' | 'ł' | 'ń' | 'ó' | 'ś' | 'ź' | 'ż' => polish += 1,
            'ß' | 'ä' | 'ö' | 'ü' => german += 1,
            'à' | 'â' | 'ç' | 'é' | 'è' | 'ê' | 'ë' | 'î' | 'ï' | 'ô' | 'ù' | 'û' | 'ÿ' | 'œ' => {
                french += 1
            }
            _ => {}
        }
    }
    (polish, german, french)
}

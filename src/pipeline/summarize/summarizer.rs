//! Document summaries through the language model, with a local
//! keyword-based fallback when the model is unreachable.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::LlmClient;
use crate::pipeline::language_detect::{detect_language, Language};

/// Only this much normalized text is sent for a document summary.
pub const MAX_ANALYZED_CHARS: usize = 15_000;

/// Length hint passed to the model for summaries.
pub const DEFAULT_SUMMARY_LENGTH: usize = 300;

/// Summary stored for documents without any extracted text.
pub const EMPTY_DOCUMENT_SUMMARY: &str = "Brak treści w pliku PDF.";

const KEYWORD_POOL: usize = 10;
const KEYWORDS_SHOWN: usize = 7;
const EXCERPT_SENTENCES: usize = 3;
const EXCERPT_MAX_CHARS: usize = 400;

/// Where a summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    Llm,
    Local,
    NoText,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub language: Language,
    pub source: SummarySource,
}

/// Summarizes document text with the configured model.
///
/// Never fails: remote errors are logged and replaced by an empty summary
/// (`summarize`) or by the local keyword summary (`analyze`).
pub struct DocumentSummarizer {
    client: Arc<dyn LlmClient + Send + Sync>,
    model: String,
}

impl DocumentSummarizer {
    pub fn new(client: Arc<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One-paragraph summary of `text`, or `""` when the model fails.
    pub fn summarize(&self, text: &str, max_length: usize) -> String {
        let prompt =
            format!("Summarize this text in one short paragraph (max {max_length} chars):\n\n{text}");
        match self.client.generate(&self.model, &prompt, "") {
            Ok(response) => response.trim().to_string(),
            Err(e) => {
                warn!(model = %self.model, error = %e, "Summary generation failed");
                String::new()
            }
        }
    }

    /// Summarize a whole document in its own language.
    pub fn analyze(&self, text: &str) -> DocumentAnalysis {
        if text.trim().is_empty() {
            return DocumentAnalysis {
                summary: EMPTY_DOCUMENT_SUMMARY.to_string(),
                language: Language::Unknown,
                source: SummarySource::NoText,
            };
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let text = truncate_chars(&collapsed, MAX_ANALYZED_CHARS);
        let language = detect_language(text);
        info!(language = %language, chars = text.chars().count(), "Analyzing document");

        let prompt = format!("{}\n\n{text}", summary_instruction(language));
        let summary = self.summarize(&prompt, DEFAULT_SUMMARY_LENGTH);
        if !summary.is_empty() {
            return DocumentAnalysis {
                summary,
                language,
                source: SummarySource::Llm,
            };
        }

        debug!(language = %language, "Using local keyword summary");
        DocumentAnalysis {
            summary: local_summary(text, language),
            language,
            source: SummarySource::Local,
        }
    }
}

fn summary_instruction(language: Language) -> &'static str {
    match language {
        Language::Polish => "Streść poniższy tekst w kilku zdaniach w języku polskim:",
        Language::English => "Summarize the following text in English in a few sentences:",
        Language::German => "Fasse den folgenden Text auf Deutsch in wenigen Sätzen zusammen:",
        _ => "Summarize the following text briefly:",
    }
}

/// Keyword and excerpt summary built without the model.
///
/// Keywords are the most frequent words of five or more letters; the
/// excerpt is three sentences taken from the start of the middle third.
pub fn local_summary(text: &str, language: Language) -> String {
    let keywords = top_keywords(text, KEYWORD_POOL);
    let shown = keywords
        .iter()
        .take(KEYWORDS_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let first = keywords.first().map(String::as_str);

    let sentences = split_sentences(text);
    let start = sentences.len() / 3;
    let excerpt = sentences
        .iter()
        .skip(start)
        .take(EXCERPT_SENTENCES)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let excerpt = truncate_chars(&excerpt, EXCERPT_MAX_CHARS).trim();

    match language {
        Language::Polish => format!(
            "Dokument dotyczy tematów takich jak: {shown}. Opisuje kluczowe zagadnienia, m.in. {}. Omawia również: {excerpt}...",
            first.unwrap_or("temat główny")
        ),
        Language::English => format!(
            "The document covers topics such as: {shown}. It describes key issues like {}. It also discusses: {excerpt}...",
            first.unwrap_or("the main topic")
        ),
        _ => format!(
            "Main topics: {shown}. Key point: {}. Excerpt: {excerpt}...",
            first.unwrap_or("main subject")
        ),
    }
}

static LONG_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w{5,}\b").unwrap());

/// Most frequent long words, ties broken by first appearance.
fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for m in LONG_WORD.find_iter(&lower) {
        let count = counts.entry(m.as_str()).or_insert(0);
        if *count == 0 {
            order.push(m.as_str());
        }
        *count += 1;
    }
    // stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(limit).map(str::to_string).collect()
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if after_terminal && c.is_whitespace() {
            sentences.push(&text[start..i]);
            let mut next = i + c.len_utf8();
            while let Some(&(j, d)) = chars.peek() {
                if !d.is_whitespace() {
                    break;
                }
                next = j + d.len_utf8();
                chars.next();
            }
            start = next;
            after_terminal = false;
            continue;
        }
        after_terminal = matches!(c, '.' | '!' | '?');
    }
    sentences.push(&text[start..]);
    sentences
}

/// Prefix of at most `max` chars, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::sanitize::TextNormalizer;

/// Rendering resolution for the OCR stage.
pub const DEFAULT_OCR_DPI: u32 = 200;

/// Structured output shorter than this (after trimming) is treated as a
/// scanned document and sent to OCR.
pub const DEFAULT_MIN_STRUCTURED_CHARS: usize = 50;

/// Tesseract language set used when the document language is not yet known.
pub const DEFAULT_OCR_LANGUAGES: &str = "pol+eng";

/// How page text from the structured stage is checked for mis-decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingPolicy {
    /// Detect and re-decode each page on its own. PDFs assembled by several
    /// producers can mix encodings between pages.
    PerPage,
    /// Trust the text layer as decoded.
    Disabled,
}

/// Tunables for `TextExtractionPipeline`.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub ocr_dpi: u32,
    pub min_structured_chars: usize,
    pub ocr_languages: String,
    pub encoding_policy: EncodingPolicy,
    pub normalizer: TextNormalizer,
    /// Wall-clock budget per document, checked at stage boundaries.
    pub time_budget: Option<Duration>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_dpi: DEFAULT_OCR_DPI,
            min_structured_chars: DEFAULT_MIN_STRUCTURED_CHARS,
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            encoding_policy: EncodingPolicy::PerPage,
            normalizer: TextNormalizer::default(),
            time_budget: None,
        }
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// A PDF handed to the pipeline, either already in memory or on disk.
///
/// Path sources are opened by each collaborator itself so large files
/// never need to be loaded up front by the caller.
#[derive(Debug, Clone, Copy)]
pub enum DocumentSource<'a> {
    Bytes(&'a [u8]),
    Path(&'a Path),
}

impl<'a> DocumentSource<'a> {
    /// Short label for logs and warnings.
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
            Self::Path(path) => path.display().to_string(),
        }
    }

    /// Reject sources that cannot possibly hold a document.
    pub fn check_not_empty(&self) -> Result<(), ExtractionError> {
        match self {
            Self::Bytes(bytes) if bytes.is_empty() => Err(ExtractionError::EmptySource(
                "zero-byte buffer".into(),
            )),
            Self::Bytes(_) => Ok(()),
            Self::Path(path) => {
                let metadata = std::fs::metadata(path)?;
                if !metadata.is_file() {
                    return Err(ExtractionError::EmptySource(format!(
                        "{} is not a regular file",
                        path.display()
                    )));
                }
                if metadata.len() == 0 {
                    return Err(ExtractionError::EmptySource(format!(
                        "{} is empty",
                        path.display()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Which stage produced the final text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStage {
    Structured,
    Ocr,
    Empty,
}

impl SourceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "STRUCTURED",
            Self::Ocr => "OCR",
            Self::Empty => "EMPTY",
        }
    }
}

/// Output of one pipeline invocation.
///
/// Fields are read-only so `char_count` always matches the text and an
/// `Empty` result always carries an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    normalized_text: String,
    source_stage: SourceStage,
    char_count: usize,
    warnings: Vec<String>,
}

impl ExtractionResult {
    pub(crate) fn with_text(stage: SourceStage, text: String, warnings: Vec<String>) -> Self {
        let text = if stage == SourceStage::Empty {
            String::new()
        } else {
            text
        };
        Self {
            char_count: text.chars().count(),
            normalized_text: text,
            source_stage: stage,
            warnings,
        }
    }

    pub(crate) fn empty(warnings: Vec<String>) -> Self {
        Self::with_text(SourceStage::Empty, String::new(), warnings)
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    pub fn source_stage(&self) -> SourceStage {
        self.source_stage
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_text(self) -> String {
        self.normalized_text
    }
}

/// Raw OCR result from the engine
#[derive(Debug)]
pub struct OcrPageResult {
    pub text: String,
    /// Mean word confidence in 0.0-1.0, when the engine reports one.
    pub confidence: Option<f32>,
}

/// Reads the machine-readable text layer of a PDF, one entry per page.
pub trait PdfTextLayer {
    fn extract_pages(&self, source: &DocumentSource<'_>) -> Result<Vec<String>, ExtractionError>;
}

/// Renders PDF pages to PNG images for OCR.
pub trait PdfPageRenderer {
    fn page_count(&self, source: &DocumentSource<'_>) -> Result<usize, ExtractionError>;

    /// Render a single 0-based page at the requested resolution.
    fn render_page(
        &self,
        source: &DocumentSource<'_>,
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    /// Recognize text in an encoded image using a `+`-joined language list
    /// such as `pol+eng`.
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_count_counts_chars_not_bytes() {
        let result = ExtractionResult::with_text(SourceStage::Structured, "Łódź".into(), vec![]);
        assert_eq!(result.char_count(), 4);
        assert_eq!(result.normalized_text().len(), 7);
    }

    #[test]
    fn empty_stage_discards_text() {
        let result = ExtractionResult::with_text(SourceStage::Empty, "leftover".into(), vec![]);
        assert_eq!(result.normalized_text(), "");
        assert_eq!(result.char_count(), 0);
    }

    #[test]
    fn stage_serializes_upper_case() {
        let json = serde_json::to_string(&SourceStage::Ocr).unwrap();
        assert_eq!(json, "\"OCR\"");
        assert_eq!(SourceStage::Structured.as_str(), "STRUCTURED");
    }

    #[test]
    fn zero_byte_buffer_is_rejected() {
        let source = DocumentSource::Bytes(&[]);
        assert!(matches!(
            source.check_not_empty(),
            Err(ExtractionError::EmptySource(_))
        ));
    }

    #[test]
    fn missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let source = DocumentSource::Path(&path);
        assert!(matches!(source.check_not_empty(), Err(ExtractionError::Io(_))));
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();
        let source = DocumentSource::Path(&path);
        assert!(matches!(
            source.check_not_empty(),
            Err(ExtractionError::EmptySource(_))
        ));
    }

    #[test]
    fn describe_mentions_size_or_path() {
        assert!(DocumentSource::Bytes(b"abc").describe().contains("3 bytes"));
        let path = Path::new("/tmp/report.pdf");
        assert_eq!(DocumentSource::Path(path).describe(), "/tmp/report.pdf");
    }
}

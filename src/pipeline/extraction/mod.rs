pub mod types;
pub mod config;
pub mod sanitize;
pub mod encoding;
pub mod cancel;
pub mod pdf;
pub mod pdfium;
pub mod pdf_renderer;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use config::*;
pub use sanitize::*;
pub use encoding::*;
pub use cancel::*;
pub use pdf::*;
pub use pdfium::*;
pub use pdf_renderer::*;
pub use ocr::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the extraction stages.
///
/// None of these escape `TextExtractionPipeline::extract`: each one is
/// absorbed at the stage that raised it and rendered into the result's
/// warning list. Page numbers are stored 0-based and displayed 1-based.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty source: {0}")]
    EmptySource(String),

    #[error("PDF could not be parsed: {0}")]
    ParseFailure(String),

    #[error("encoding repair failed on page {}: {reason}", .page + 1)]
    EncodingRepairFailure { page: usize, reason: String },

    #[error("page renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("page {} could not be rasterized: {reason}", .page + 1)]
    RasterizationFailure { page: usize, reason: String },

    #[error("OCR failed on page {}: {reason}", .page + 1)]
    RecognitionFailure { page: usize, reason: String },

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("no text could be extracted: {0}")]
    TotalExtractionFailure(String),

    #[error("extraction cancelled {0}")]
    Cancelled(String),
}

//! Multi-stage text extraction with fallback.
//!
//! Stages run in a fixed order until one accepts:
//!
//! 1. structured: read the PDF text layer page by page, repair per-page
//!    encoding, expand ligatures, apply the quality gate, normalize.
//! 2. ocr: rasterize every page, recognize it, normalize each page and
//!    join pages with newlines.
//!
//! When no stage accepts, the result is `Empty` with a warning trail.
//! Nothing here returns an error or panics to the caller.

use std::fmt;

use tracing::{debug, info, warn};

use super::cancel::CancellationToken;
use super::config::{EncodingPolicy, ExtractionConfig};
use super::encoding::{repair_page_encoding, RepairOutcome};
use super::pdf_renderer::LopdfImageExtractor;
use super::pdfium::PdfiumRenderer;
use super::sanitize::expand_ligatures;
use super::types::{
    DocumentSource, ExtractionResult, OcrEngine, PdfPageRenderer, PdfTextLayer, SourceStage,
};
use super::ExtractionError;

/// Why a stage declined to produce the final text.
#[derive(Debug)]
enum StageFailure {
    Fault(ExtractionError),
    BelowQualityGate { chars: usize, threshold: usize },
    NoText(String),
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault(e) => write!(f, "{e}"),
            Self::BelowQualityGate { chars, threshold } => write!(
                f,
                "text layer too short ({chars} of {threshold} required chars), treating document as scanned"
            ),
            Self::NoText(detail) => write!(f, "{detail}"),
        }
    }
}

enum StageOutcome {
    Accepted { stage: SourceStage, text: String },
    Failed(StageFailure),
}

/// Per-invocation state shared by the stages.
struct StageContext<'t> {
    token: &'t CancellationToken,
    warnings: Vec<String>,
}

impl StageContext<'_> {
    fn warn(&mut self, stage: &str, message: impl fmt::Display) {
        self.warnings.push(format!("{stage}: {message}"));
    }
}

type StageFn = fn(&TextExtractionPipeline, &DocumentSource<'_>, &mut StageContext<'_>) -> StageOutcome;

/// Converts a PDF into normalized text, falling back from the text layer
/// to OCR. Collaborators are injected as trait objects.
pub struct TextExtractionPipeline {
    text_layer: Box<dyn PdfTextLayer + Send + Sync>,
    ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    pdf_renderer: Option<Box<dyn PdfPageRenderer + Send + Sync>>,
    config: ExtractionConfig,
}

impl TextExtractionPipeline {
    const STAGES: [(&'static str, StageFn); 2] = [
        ("structured", Self::structured_stage),
        ("ocr", Self::ocr_stage),
    ];

    pub fn new(
        text_layer: Box<dyn PdfTextLayer + Send + Sync>,
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    ) -> Self {
        Self {
            text_layer,
            ocr_engine,
            pdf_renderer: None,
            config: ExtractionConfig::default(),
        }
    }

    /// Add the page renderer used by the OCR stage. Without one, OCR is
    /// reported as unavailable and scanned documents come back empty.
    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfPageRenderer + Send + Sync>) -> Self {
        self.pdf_renderer = Some(renderer);
        self
    }

    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract with the configured time budget, if any.
    pub fn extract(&self, source: DocumentSource<'_>) -> ExtractionResult {
        let token = match self.config.time_budget {
            Some(budget) => CancellationToken::with_budget(budget),
            None => CancellationToken::new(),
        };
        self.extract_with_cancel(source, &token)
    }

    /// Extract, stopping at the next stage or page boundary once `token`
    /// trips. OCR pages recognized before that point are kept.
    pub fn extract_with_cancel(
        &self,
        source: DocumentSource<'_>,
        token: &CancellationToken,
    ) -> ExtractionResult {
        let label = source.describe();
        info!(source = %label, "Starting text extraction");

        if let Err(e) = source.check_not_empty() {
            warn!(source = %label, error = %e, "Nothing to extract");
            return ExtractionResult::empty(vec![format!("source: {e}")]);
        }

        let mut ctx = StageContext {
            token,
            warnings: Vec::new(),
        };

        for (name, stage) in Self::STAGES {
            if let Err(e) = token.check(&format!("before {name} stage")) {
                warn!(source = %label, stage = name, "Extraction cancelled");
                ctx.warn(name, e);
                return ExtractionResult::empty(ctx.warnings);
            }

            match stage(self, &source, &mut ctx) {
                StageOutcome::Accepted { stage, text } => {
                    let result = ExtractionResult::with_text(stage, text, ctx.warnings);
                    info!(
                        source = %label,
                        stage = stage.as_str(),
                        chars = result.char_count(),
                        warnings = result.warnings().len(),
                        "Text extraction complete"
                    );
                    return result;
                }
                StageOutcome::Failed(StageFailure::Fault(e @ ExtractionError::Cancelled(_))) => {
                    warn!(source = %label, stage = name, "Extraction cancelled");
                    ctx.warn(name, e);
                    return ExtractionResult::empty(ctx.warnings);
                }
                StageOutcome::Failed(failure) => {
                    warn!(source = %label, stage = name, reason = %failure, "Extraction stage failed");
                    ctx.warn(name, failure);
                }
            }
        }

        let total = ExtractionError::TotalExtractionFailure(format!(
            "neither the text layer nor OCR yielded text for {label}"
        ));
        warn!(source = %label, "{total}");
        ctx.warnings.push(total.to_string());
        ExtractionResult::empty(ctx.warnings)
    }

    fn structured_stage(&self, source: &DocumentSource<'_>, ctx: &mut StageContext<'_>) -> StageOutcome {
        let pages = match self.text_layer.extract_pages(source) {
            Ok(pages) => pages,
            Err(e) => return StageOutcome::Failed(StageFailure::Fault(e)),
        };
        let page_total = pages.len();

        let mut kept = Vec::with_capacity(page_total);
        for (index, raw) in pages.into_iter().enumerate() {
            let decoded = match self.config.encoding_policy {
                EncodingPolicy::Disabled => raw,
                EncodingPolicy::PerPage => match repair_page_encoding(index, &raw) {
                    Ok(RepairOutcome::Unchanged) => raw,
                    Ok(RepairOutcome::Repaired { encoding, text }) => {
                        debug!(page = index, encoding, "Re-decoded page text");
                        text
                    }
                    Err(e) => {
                        ctx.warn("structured", e);
                        raw
                    }
                },
            };
            let text = expand_ligatures(&decoded);
            if !text.trim().is_empty() {
                kept.push(text);
            }
        }

        let joined = kept.join(" ");
        let joined = joined.trim();
        let chars = joined.chars().count();
        debug!(pages = page_total, non_blank = kept.len(), chars, "Structured extraction done");

        if chars < self.config.min_structured_chars {
            return StageOutcome::Failed(StageFailure::BelowQualityGate {
                chars,
                threshold: self.config.min_structured_chars,
            });
        }

        let text = self.config.normalizer.normalize(joined);
        if text.is_empty() {
            return StageOutcome::Failed(StageFailure::NoText(
                "text layer holds no printable characters".into(),
            ));
        }
        StageOutcome::Accepted {
            stage: SourceStage::Structured,
            text,
        }
    }

    fn ocr_stage(&self, source: &DocumentSource<'_>, ctx: &mut StageContext<'_>) -> StageOutcome {
        let Some(renderer) = self.pdf_renderer.as_deref() else {
            return StageOutcome::Failed(StageFailure::Fault(ExtractionError::RendererUnavailable(
                "no page renderer configured".into(),
            )));
        };

        let page_count = match renderer.page_count(source) {
            Ok(0) => {
                return StageOutcome::Failed(StageFailure::Fault(ExtractionError::ParseFailure(
                    "document has zero pages".into(),
                )))
            }
            Ok(n) => n,
            Err(e) => return StageOutcome::Failed(StageFailure::Fault(e)),
        };

        let mut page_texts: Vec<String> = Vec::with_capacity(page_count);
        let mut rasterized = 0usize;

        for page in 0..page_count {
            if let Err(e) = ctx.token.check(&format!("before OCR of page {}", page + 1)) {
                if page_texts.is_empty() {
                    return StageOutcome::Failed(StageFailure::Fault(e));
                }
                ctx.warn("ocr", e);
                break;
            }

            let image = match renderer.render_page(source, page, self.config.ocr_dpi) {
                Ok(image) => image,
                Err(e) => {
                    ctx.warn("ocr", as_page_error(page, e, PageStep::Rasterize));
                    continue;
                }
            };
            rasterized += 1;

            let recognized = match self
                .ocr_engine
                .ocr_image_with_lang(&image, &self.config.ocr_languages)
            {
                Ok(result) => result,
                Err(e) => {
                    ctx.warn("ocr", as_page_error(page, e, PageStep::Recognize));
                    continue;
                }
            };

            let text = self.config.normalizer.normalize(&recognized.text);
            debug!(
                page,
                chars = text.chars().count(),
                confidence = ?recognized.confidence,
                "OCR page done"
            );
            if !text.is_empty() {
                page_texts.push(text);
            }
        }

        if page_texts.is_empty() {
            return StageOutcome::Failed(StageFailure::NoText(format!(
                "OCR recognized no text on {rasterized} of {page_count} pages"
            )));
        }
        StageOutcome::Accepted {
            stage: SourceStage::Ocr,
            text: page_texts.join("\n"),
        }
    }
}

#[derive(Clone, Copy)]
enum PageStep {
    Rasterize,
    Recognize,
}

/// Attach the page number to collaborator errors that lack one.
fn as_page_error(page: usize, err: ExtractionError, step: PageStep) -> ExtractionError {
    match (step, err) {
        (_, e @ ExtractionError::RasterizationFailure { .. }) => e,
        (_, e @ ExtractionError::RecognitionFailure { .. }) => e,
        (PageStep::Rasterize, e) => ExtractionError::RasterizationFailure {
            page,
            reason: e.to_string(),
        },
        (PageStep::Recognize, e) => ExtractionError::RecognitionFailure {
            page,
            reason: e.to_string(),
        },
    }
}

/// PDFium when the library can be loaded, otherwise embedded page images.
pub fn default_page_renderer() -> Box<dyn PdfPageRenderer + Send + Sync> {
    match PdfiumRenderer::new() {
        Ok(renderer) => Box::new(renderer),
        Err(e) => {
            warn!(error = %e, "PDFium unavailable, OCR will read embedded page images");
            Box::new(LopdfImageExtractor)
        }
    }
}

pub mod api;
pub mod config;
pub mod db;
pub mod pipeline;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::AppConfig;
use crate::pipeline::extraction::{
    default_page_renderer, OcrEngine, PdfTextExtractor, TesseractCli, TextExtractionPipeline,
};
use crate::pipeline::import::UploadStore;
use crate::pipeline::processor::DocumentProcessor;
use crate::pipeline::qa::DocumentQa;
use crate::pipeline::search::{ElasticsearchClient, SearchIndex};
use crate::pipeline::summarize::{DocumentSummarizer, LlmClient, OllamaClient};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry database: {0}")]
    Database(#[from] db::DatabaseError),

    #[error("Upload directory: {0}")]
    Import(#[from] pipeline::import::ImportError),
}

/// Build every collaborator, clean the registry, then serve the HTTP API
/// until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env();
    // Blocking HTTP clients are built and dropped outside the async runtime.
    let ctx = build_context(&config)?;

    match ctx.processor.cleanup_missing(&ctx.db) {
        Ok(report) if !report.removed.is_empty() || !report.failed.is_empty() => {
            tracing::info!(
                removed = report.removed.len(),
                failed = report.failed.len(),
                "Dropped registry entries for missing files"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Startup cleanup failed"),
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api::serve(config.bind_addr, ctx.clone()))?;
    drop(runtime);
    drop(ctx);
    Ok(())
}

fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    let pipeline = TextExtractionPipeline::new(Box::new(PdfTextExtractor), build_ocr_engine(config))
        .with_pdf_renderer(default_page_renderer())
        .with_config(config.extraction.clone());

    let llm: Arc<dyn LlmClient + Send + Sync> = Arc::new(OllamaClient::new(
        &config.ollama_url,
        config.ollama_timeout_secs,
    ));
    match llm.is_model_available(&config.ollama_model) {
        Ok(true) => tracing::info!(model = %config.ollama_model, "Summaries via Ollama"),
        Ok(false) => tracing::warn!(
            model = %config.ollama_model,
            "Model not installed, summaries fall back to keyword extracts"
        ),
        Err(e) => tracing::warn!(error = %e, "Ollama unreachable, summaries fall back to keyword extracts"),
    }

    let index: Arc<dyn SearchIndex + Send + Sync> = Arc::new(
        ElasticsearchClient::new(&config.elasticsearch_url, config.elasticsearch_timeout_secs)
            .with_index(&config.elasticsearch_index),
    );
    if !index.ping() {
        tracing::warn!(url = %config.elasticsearch_url, "Elasticsearch unreachable, uploads will not be searchable");
    } else if let Err(e) = index.ensure_index() {
        tracing::warn!(error = %e, "Could not create search index");
    }

    let summarizer = DocumentSummarizer::new(llm.clone(), &config.ollama_model);
    let processor = DocumentProcessor::new(pipeline, summarizer, index.clone());
    let qa = DocumentQa::new(llm.clone(), &config.ollama_model, index);

    Ok(ApiContext {
        processor: Arc::new(processor),
        qa: Arc::new(qa),
        db: Arc::new(Mutex::new(db::open_database(&config.db_path)?)),
        store: Arc::new(UploadStore::new(&config.upload_dir)?),
        llm,
        llm_model: config.ollama_model.clone(),
    })
}

/// Native Tesseract when built with the `ocr` feature and language data
/// is found, otherwise the `tesseract` command-line tool.
fn build_ocr_engine(config: &AppConfig) -> Box<dyn OcrEngine + Send + Sync> {
    #[cfg(feature = "ocr")]
    {
        if let Some(tessdata) = &config.tessdata_dir {
            match pipeline::extraction::BundledTesseract::new(tessdata) {
                Ok(engine) => {
                    tracing::info!(tessdata = %tessdata.display(), "Tesseract OCR initialized");
                    return Box::new(engine);
                }
                Err(e) => tracing::warn!(error = %e, "Native Tesseract unavailable"),
            }
        }
    }

    let mut cli = TesseractCli::new(&config.tesseract_binary);
    if let Some(tessdata) = &config.tessdata_dir {
        cli = cli.with_tessdata_dir(tessdata);
    }
    if !cli.is_available() {
        tracing::warn!(
            binary = %config.tesseract_binary.display(),
            "tesseract not found, scanned documents will come back empty"
        );
    }
    Box::new(cli)
}

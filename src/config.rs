use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::extraction::{EncodingPolicy, ExtractionConfig};
use crate::pipeline::search::DEFAULT_INDEX;

/// Application-level constants
pub const APP_NAME: &str = "DocFinder";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,docfinder_lib=debug,pdf_extract=warn,lopdf=warn"
}

/// Application data directory: `~/DocFinder/`, or `./DocFinder` when the
/// home directory cannot be determined.
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => {
            tracing::warn!("Cannot determine home directory, using working directory");
            PathBuf::from(APP_NAME)
        }
    }
}

/// Where uploaded PDFs are kept.
pub fn uploads_dir() -> PathBuf {
    app_data_dir().join("uploads")
}

/// Document registry database.
pub fn registry_path() -> PathBuf {
    app_data_dir().join("documents.db")
}

/// Runtime settings, read from `DOCFINDER_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub db_path: PathBuf,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
    pub elasticsearch_url: String,
    pub elasticsearch_index: String,
    pub elasticsearch_timeout_secs: u64,
    pub tesseract_binary: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values are
    /// logged and replaced by their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str, default: &str| -> String { var(key).unwrap_or_else(|| default.into()) };

        let mut extraction = ExtractionConfig::default();
        extraction.ocr_dpi = parse_or(var("DOCFINDER_OCR_DPI"), "DOCFINDER_OCR_DPI", extraction.ocr_dpi);
        extraction.min_structured_chars = parse_or(
            var("DOCFINDER_MIN_STRUCTURED_CHARS"),
            "DOCFINDER_MIN_STRUCTURED_CHARS",
            extraction.min_structured_chars,
        );
        if let Some(langs) = var("DOCFINDER_OCR_LANGS") {
            extraction.ocr_languages = langs;
        }
        if let Some(extra) = var("DOCFINDER_EXTRA_CHARS") {
            extraction.normalizer = extraction.normalizer.with_extra_chars(&extra);
        }
        extraction.time_budget = var("DOCFINDER_TIME_BUDGET_SECS")
            .and_then(|v| parse_value::<u64>(&v, "DOCFINDER_TIME_BUDGET_SECS"))
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        match var("DOCFINDER_ENCODING_REPAIR").as_deref() {
            None | Some("per_page") => {}
            Some("disabled") => extraction.encoding_policy = EncodingPolicy::Disabled,
            Some(other) => {
                tracing::warn!(value = other, "Unknown DOCFINDER_ENCODING_REPAIR, keeping per_page")
            }
        }

        Self {
            bind_addr: parse_or(
                var("DOCFINDER_BIND"),
                "DOCFINDER_BIND",
                SocketAddr::from(([0, 0, 0, 0], 8000)),
            ),
            upload_dir: var("DOCFINDER_UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(uploads_dir),
            db_path: var("DOCFINDER_DB_PATH").map(PathBuf::from).unwrap_or_else(registry_path),
            ollama_url: parsed("DOCFINDER_OLLAMA_URL", DEFAULT_OLLAMA_URL),
            ollama_model: parsed("DOCFINDER_OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            ollama_timeout_secs: parse_or(var("DOCFINDER_OLLAMA_TIMEOUT_SECS"), "DOCFINDER_OLLAMA_TIMEOUT_SECS", 300),
            elasticsearch_url: parsed("DOCFINDER_ES_URL", DEFAULT_ELASTICSEARCH_URL),
            elasticsearch_index: parsed("DOCFINDER_ES_INDEX", DEFAULT_INDEX),
            elasticsearch_timeout_secs: parse_or(var("DOCFINDER_ES_TIMEOUT_SECS"), "DOCFINDER_ES_TIMEOUT_SECS", 30),
            tesseract_binary: PathBuf::from(parsed("DOCFINDER_TESSERACT", "tesseract")),
            tessdata_dir: var("DOCFINDER_TESSDATA")
                .or_else(|| var("TESSDATA_PREFIX"))
                .map(PathBuf::from),
            extraction,
        }
    }
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "Ignoring unparseable setting");
            None
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    raw.and_then(|v| parse_value(&v, key)).unwrap_or(default)
}

//! Shared state and response bodies for the HTTP API.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::pipeline::import::UploadStore;
use crate::pipeline::language_detect::Language;
use crate::pipeline::processor::DocumentProcessor;
use crate::pipeline::qa::{DocumentQa, QaAnswer};
use crate::pipeline::search::SearchIndex;
use crate::pipeline::summarize::LlmClient;

/// Shared context for all API routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<DocumentProcessor>,
    pub qa: Arc<DocumentQa>,
    pub db: Arc<Mutex<Connection>>,
    pub store: Arc<UploadStore>,
    pub llm: Arc<dyn LlmClient + Send + Sync>,
    pub llm_model: String,
}

impl ApiContext {
    pub fn index(&self) -> &Arc<dyn SearchIndex + Send + Sync> {
        self.processor.index()
    }

    /// Run blocking pipeline, registry or remote-service work off the
    /// async executor.
    pub async fn blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(ApiContext) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = self.clone();
        tokio::task::spawn_blocking(move || work(ctx)).await?
    }
}

// ═══════════════════════════════════════════════════════════
// Request / response bodies
// ═══════════════════════════════════════════════════════════

/// One row of `GET /documents`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListItem {
    pub filename: String,
    pub preview: String,
    pub summary: String,
    pub language: String,
    pub extraction_stage: String,
    pub uploaded_at: String,
}

/// Per-file entry of `POST /upload-multiple`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchUploadItem {
    pub filename: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchUploadResponse {
    pub uploaded: Vec<BatchUploadItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub filename: String,
    pub preview: String,
    pub summary: String,
    pub language: String,
    pub score: f64,
    pub highlights: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct AiQueryParams {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AiQueryResponse {
    pub query: String,
    pub answer: QaAnswer,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub app: String,
    pub version: String,
    pub elasticsearch: SearchHealth,
    pub llm: LlmHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHealth {
    pub connected: bool,
    pub index: Option<String>,
    pub docs: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LlmHealth {
    pub enabled: bool,
    pub model: String,
}

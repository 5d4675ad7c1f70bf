//! Maintenance endpoints: index management, health and registry cleanup.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, HealthResponse, LlmHealth, MessageResponse, SearchHealth};
use crate::config;
use crate::pipeline::processor::CleanupReport;

/// `GET /`
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("🚀 {} API is running", config::APP_NAME),
        "version": config::APP_VERSION,
    }))
}

/// `DELETE /clear-index`: drop every document from the search index.
/// The registry and stored files are kept, so `reindex-all` can rebuild it.
pub async fn clear_index(State(ctx): State<ApiContext>) -> Result<Json<MessageResponse>, ApiError> {
    let removed = ctx.blocking(|ctx| Ok(ctx.index().clear()?)).await?;
    tracing::info!(removed, "Search index cleared");
    Ok(Json(MessageResponse {
        message: "✅ Elasticsearch index cleared successfully.".into(),
    }))
}

/// `POST /reindex-all`: process every stored document again.
pub async fn reindex_all(State(ctx): State<ApiContext>) -> Result<Json<MessageResponse>, ApiError> {
    let count = ctx
        .blocking(|ctx| Ok(ctx.processor.reindex_all(&ctx.db)?))
        .await?;
    Ok(Json(MessageResponse {
        message: format!("✅ Reindexed {count} documents in Elasticsearch."),
    }))
}

/// `GET /admin/health`: reachability of the search index and the model.
pub async fn health(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let response = ctx
        .blocking(|ctx| {
            let connected = ctx.index().ping();
            let enabled = match ctx.llm.is_model_available(&ctx.llm_model) {
                Ok(available) => available,
                Err(e) => {
                    tracing::debug!(error = %e, "Model check failed");
                    false
                }
            };
            Ok(HealthResponse {
                app: "running".into(),
                version: config::APP_VERSION.into(),
                elasticsearch: SearchHealth {
                    connected,
                    index: connected.then(|| ctx.index().index_name().to_string()),
                    docs: if connected { "OK" } else { "unavailable" }.into(),
                },
                llm: LlmHealth {
                    enabled,
                    model: ctx.llm_model.clone(),
                },
            })
        })
        .await?;
    Ok(Json(response))
}

/// `DELETE /admin/cleanup`: forget documents whose file is gone.
pub async fn cleanup(State(ctx): State<ApiContext>) -> Result<Json<CleanupReport>, ApiError> {
    let report = ctx
        .blocking(|ctx| Ok(ctx.processor.cleanup_missing(&ctx.db)?))
        .await?;
    Ok(Json(report))
}

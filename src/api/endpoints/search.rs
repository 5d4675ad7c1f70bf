//! `GET /search?query=` over the search index.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SearchParams, SearchResultItem};
use crate::pipeline::summarize::truncate_chars;

const RESULT_LIMIT: usize = 10;
const RESULT_PREVIEW_CHARS: usize = 300;

pub async fn search(
    State(ctx): State<ApiContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResultItem>>, ApiError> {
    let query = params.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query required".into()));
    }

    let hits = ctx
        .blocking(move |ctx| Ok(ctx.index().search(&query, RESULT_LIMIT)?))
        .await?;

    Ok(Json(
        hits.into_iter()
            .map(|hit| SearchResultItem {
                preview: truncate_chars(&hit.content, RESULT_PREVIEW_CHARS).to_string(),
                filename: hit.filename,
                summary: hit.summary,
                language: hit.language,
                score: hit.score,
                highlights: hit.highlights,
            })
            .collect(),
    ))
}

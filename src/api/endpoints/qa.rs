//! Question answering over the indexed collection.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AiQueryParams, AiQueryResponse, ApiContext, QuestionRequest};
use crate::pipeline::qa::QaAnswer;

/// `POST /qa`: answer strictly from the retrieved context.
pub async fn chat(
    State(ctx): State<ApiContext>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QaAnswer>, ApiError> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question required".into()));
    }
    let answer = ctx.blocking(move |ctx| Ok(ctx.qa.chat(&question))).await?;
    Ok(Json(answer))
}

/// `GET /ai/query?text=`: answer in the question's language from the best
/// matching summaries.
pub async fn ai_query(
    State(ctx): State<ApiContext>,
    Query(params): Query<AiQueryParams>,
) -> Result<Json<AiQueryResponse>, ApiError> {
    let text = params.text.trim().to_string();
    if text.chars().count() < 2 {
        return Err(ApiError::BadRequest(
            "Query must be at least 2 characters".into(),
        ));
    }
    let query = text.clone();
    let answer = ctx.blocking(move |ctx| Ok(ctx.qa.ask(&text))).await?;
    Ok(Json(AiQueryResponse { query, answer }))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::endpoints::test_support::{seed_index, test_context};
    use crate::api::router::api_router;

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_answers_with_sources() {
        let (ctx, handles) = test_context();
        seed_index(&handles);
        let request = Request::post("/qa")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"question":"invoice hours"}"#))
            .unwrap();

        let response = api_router(ctx).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json(response).await;
        assert_eq!(json["answer"], "Mock summary of the document.");
        assert_eq!(json["sources"][0], "invoice.pdf");
        assert!(handles.llm.last_prompt().unwrap().contains("QUESTION: invoice hours"));
    }

    #[tokio::test]
    async fn chat_requires_question() {
        let (ctx, _handles) = test_context();
        let request = Request::post("/qa")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"question":"   "}"#))
            .unwrap();
        let response = api_router(ctx).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ai_query_echoes_query() {
        let (ctx, handles) = test_context();
        seed_index(&handles);
        let response = api_router(ctx)
            .oneshot(Request::get("/ai/query?text=invoice").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json(response).await;
        assert_eq!(json["query"], "invoice");
        assert_eq!(json["answer"]["sources"][0], "invoice.pdf");
        assert_eq!(json["answer"]["language"], "unknown");
    }

    #[tokio::test]
    async fn ai_query_rejects_short_text() {
        let (ctx, _handles) = test_context();
        let response = api_router(ctx)
            .oneshot(Request::get("/ai/query?text=a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ai_query_with_index_down() {
        let (ctx, handles) = test_context();
        handles.index.set_online(false);
        let response = api_router(ctx)
            .oneshot(Request::get("/ai/query?text=invoice").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = json(response).await;
        assert_eq!(json["answer"]["answer"], "❌ Elasticsearch is not available.");
    }
}

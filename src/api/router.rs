//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! CORS is fully open; the service is meant for a trusted local network.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::pipeline::import::MAX_FILE_SIZE;

/// Largest accepted request body: a batch of a few maximum-size PDFs.
const MAX_BODY_BYTES: usize = 4 * MAX_FILE_SIZE as usize;

pub fn api_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/", get(endpoints::admin::root))
        .route("/upload-pdf", post(endpoints::documents::upload))
        .route("/upload-multiple", post(endpoints::documents::upload_multiple))
        .route("/documents", get(endpoints::documents::list))
        .route("/view/:filename", get(endpoints::documents::view))
        .route("/download/:filename", get(endpoints::documents::download))
        .route("/file/:filename", delete(endpoints::documents::delete))
        .route("/search", get(endpoints::search::search))
        .route("/qa", post(endpoints::qa::chat))
        .route("/ai/query", get(endpoints::qa::ai_query))
        .route("/clear-index", delete(endpoints::admin::clear_index))
        .route("/reindex-all", post(endpoints::admin::reindex_all))
        .route("/admin/health", get(endpoints::admin::health))
        .route("/admin/cleanup", delete(endpoints::admin::cleanup))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::api::endpoints::test_support::test_context;

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (ctx, _handles) = test_context();
        let response = api_router(ctx)
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let (ctx, _handles) = test_context();
        let response = api_router(ctx)
            .oneshot(Request::get("/upload-pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn cors_preflight_allowed() {
        let (ctx, _handles) = test_context();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/search")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = api_router(ctx).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn empty_registry_lists_nothing() {
        let (ctx, _handles) = test_context();
        let response = api_router(ctx)
            .oneshot(Request::get("/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"[]");
    }
}

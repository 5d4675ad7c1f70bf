//! Upload, listing, viewing and deletion of PDF documents.

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, BatchUploadItem, BatchUploadResponse, DocumentListItem};
use crate::db;
use crate::pipeline::import::{has_pdf_extension, ImportError};
use crate::pipeline::processor::{lock, ProcessingError, ProcessingOutcome};
use crate::pipeline::summarize::truncate_chars;

const LIST_PREVIEW_CHARS: usize = 300;
const BATCH_PREVIEW_CHARS: usize = 500;

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

async fn next_file(multipart: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read {filename}: {e}")))?;
        return Ok(Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// `POST /upload-pdf`: store, extract, summarize and index one PDF.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<ProcessingOutcome>, ApiError> {
    let file = next_file(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file in upload".into()))?;

    let outcome = ctx
        .blocking(move |ctx| {
            ctx.processor
                .ingest(&ctx.db, &ctx.store, &file.filename, &file.bytes)
                .map_err(ApiError::from)
        })
        .await?;
    Ok(Json(outcome))
}

/// `POST /upload-multiple`: like `upload`, with a status per file instead
/// of failing the whole request.
pub async fn upload_multiple(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, ApiError> {
    let mut uploaded = Vec::new();

    while let Some(file) = next_file(&mut multipart).await? {
        if !has_pdf_extension(&file.filename) {
            uploaded.push(status_only(file.filename, "skipped - not pdf"));
            continue;
        }

        let name = file.filename.clone();
        let result = ctx
            .blocking(move |ctx| {
                Ok(ctx
                    .processor
                    .ingest(&ctx.db, &ctx.store, &file.filename, &file.bytes))
            })
            .await?;

        let item = match result {
            Ok(outcome) => BatchUploadItem {
                filename: outcome.filename,
                status: "uploaded".into(),
                preview: Some(truncate_chars(&outcome.preview, BATCH_PREVIEW_CHARS).to_string()),
                summary: Some(outcome.summary),
                language: Some(outcome.language),
            },
            Err(ProcessingError::Import(ImportError::AlreadyExists(_)))
            | Err(ProcessingError::DuplicateContent { .. }) => status_only(name, "duplicate"),
            Err(e) => {
                tracing::warn!(filename = %name, error = %e, "Upload failed");
                status_only(name, &format!("failed: {e}"))
            }
        };
        uploaded.push(item);
    }

    Ok(Json(BatchUploadResponse { uploaded }))
}

fn status_only(filename: String, status: &str) -> BatchUploadItem {
    BatchUploadItem {
        filename,
        status: status.to_string(),
        preview: None,
        summary: None,
        language: None,
    }
}

/// `GET /documents`: registered documents, newest first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<DocumentListItem>>, ApiError> {
    let documents = ctx
        .blocking(|ctx| {
            let conn = lock(&ctx.db)?;
            Ok(db::list_documents(&conn)?)
        })
        .await?;

    Ok(Json(
        documents
            .into_iter()
            .map(|doc| DocumentListItem {
                preview: truncate_chars(&doc.preview, LIST_PREVIEW_CHARS).to_string(),
                filename: doc.filename,
                summary: doc.summary,
                language: doc.language,
                extraction_stage: doc.extraction_stage,
                uploaded_at: doc.uploaded_at,
            })
            .collect(),
    ))
}

/// `GET /view/:filename`: the PDF, displayed inline.
pub async fn view(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_pdf(ctx, filename, "inline").await
}

/// `GET /download/:filename`: the PDF as an attachment.
pub async fn download(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_pdf(ctx, filename, "attachment").await
}

async fn serve_pdf(ctx: ApiContext, filename: String, disposition: &str) -> Result<Response, ApiError> {
    let lookup = filename.clone();
    let stored = ctx
        .blocking(move |ctx| {
            let conn = lock(&ctx.db)?;
            Ok(db::get_document(&conn, &lookup)?)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;

    let bytes = match tokio::fs::read(&stored.filepath).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("File missing on disk".into()));
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(disposition, &stored.filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Plain `filename=` for printable ASCII names, RFC 5987 `filename*=`
/// otherwise.
fn content_disposition(disposition: &str, filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');
    if plain {
        format!("{disposition}; filename=\"{filename}\"")
    } else {
        format!("{disposition}; filename*=UTF-8''{}", percent_encode(filename))
    }
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// `DELETE /file/:filename`: remove the file, its registry row and its
/// index entry.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = filename.clone();
    ctx.blocking(move |ctx| {
        ctx.processor
            .remove(&ctx.db, &ctx.store, &name)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(json!({ "deleted": filename })))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::api::endpoints::test_support::{multipart_request, test_context, REPORT_TEXT};
    use crate::api::router::api_router;
    use crate::pipeline::extraction::pdf::test_pdfs::text_pdf;

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn disposition_ascii_and_unicode() {
        assert_eq!(
            content_disposition("inline", "report.pdf"),
            "inline; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("attachment", "zażółć.pdf"),
            "attachment; filename*=UTF-8''za%C5%BC%C3%B3%C5%82%C4%87.pdf"
        );
        assert_eq!(
            content_disposition("inline", "my report.pdf"),
            "inline; filename=\"my report.pdf\""
        );
    }

    #[tokio::test]
    async fn upload_then_list_view_download_delete() {
        let (ctx, _dir) = test_context();
        let app = api_router(ctx.clone());

        let pdf = text_pdf(&[REPORT_TEXT]);
        let response = app
            .clone()
            .oneshot(multipart_request("/upload-pdf", &[("report.pdf", pdf.as_slice())]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["filename"], "report.pdf");
        assert_eq!(json["stage"], "STRUCTURED");
        assert_eq!(json["indexed"], true);

        let response = app
            .clone()
            .oneshot(Request::get("/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["filename"], "report.pdf");
        assert_eq!(json[0]["summary"], "Mock summary of the document.");

        let response = app
            .clone()
            .oneshot(Request::get("/view/report.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"report.pdf\""
        );
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        assert_eq!(body.as_ref(), pdf.as_slice());

        let response = app
            .clone()
            .oneshot(Request::get("/download/report.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment;"));

        let response = app
            .clone()
            .oneshot(Request::delete("/file/report.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["deleted"], "report.pdf");

        let response = app
            .oneshot(Request::delete("/file/report.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_rejects_non_pdf() {
        let (ctx, _dir) = test_context();
        let response = api_router(ctx)
            .oneshot(multipart_request("/upload-pdf", &[("notes.txt", &b"hello"[..])]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn upload_duplicate_is_conflict() {
        let (ctx, _dir) = test_context();
        let app = api_router(ctx);
        let pdf = text_pdf(&[REPORT_TEXT]);

        let first = app
            .clone()
            .oneshot(multipart_request("/upload-pdf", &[("report.pdf", pdf.as_slice())]))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(multipart_request("/upload-pdf", &[("report.pdf", pdf.as_slice())]))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn upload_multiple_reports_each_file() {
        let (ctx, _dir) = test_context();
        let pdf = text_pdf(&[REPORT_TEXT]);
        let response = api_router(ctx)
            .oneshot(multipart_request(
                "/upload-multiple",
                &[("a.pdf", pdf.as_slice()), ("notes.txt", &b"hello"[..]), ("copy.pdf", pdf.as_slice())],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let statuses: Vec<(&str, &str)> = json["uploaded"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| {
                (
                    item["filename"].as_str().unwrap(),
                    item["status"].as_str().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("a.pdf", "uploaded"),
                ("notes.txt", "skipped - not pdf"),
                ("copy.pdf", "duplicate"),
            ]
        );
        assert!(json["uploaded"][0]["preview"].is_string());
        assert!(json["uploaded"][1].get("preview").is_none());
    }

    #[tokio::test]
    async fn view_unknown_and_missing_files() {
        let (ctx, _dir) = test_context();
        let app = api_router(ctx.clone());

        let response = app
            .clone()
            .oneshot(Request::get("/view/nothing.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["message"], "File not found");

        app.clone()
            .oneshot(multipart_request(
                "/upload-pdf",
                &[("report.pdf", text_pdf(&[REPORT_TEXT]).as_slice())],
            ))
            .await
            .unwrap();
        std::fs::remove_file(ctx.store.path_for("report.pdf")).unwrap();

        let response = app
            .oneshot(Request::get("/download/report.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "File missing on disk"
        );
    }
}

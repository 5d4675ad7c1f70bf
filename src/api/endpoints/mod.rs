//! HTTP endpoint handlers.
//!
//! Each handler moves its pipeline, registry or remote-service work onto
//! the blocking pool through `ApiContext::blocking`.

pub mod admin;
pub mod documents;
pub mod qa;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{header, Request};

    use crate::api::types::ApiContext;
    use crate::db::open_memory_database;
    use crate::pipeline::extraction::{MockOcrEngine, PdfTextExtractor, TextExtractionPipeline};
    use crate::pipeline::import::UploadStore;
    use crate::pipeline::processor::DocumentProcessor;
    use crate::pipeline::qa::DocumentQa;
    use crate::pipeline::search::{IndexedDocument, MockSearchIndex, SearchIndex};
    use crate::pipeline::summarize::{DocumentSummarizer, MockLlmClient};

    pub const REPORT_TEXT: &str = "Quarterly revenue report for the northern sales region in 2024";

    const BOUNDARY: &str = "docfinder-test-boundary";

    /// Mocks behind an `ApiContext`, kept for assertions.
    pub struct TestHandles {
        pub index: Arc<MockSearchIndex>,
        pub llm: Arc<MockLlmClient>,
        _dir: tempfile::TempDir,
    }

    pub fn test_context() -> (ApiContext, TestHandles) {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(MockSearchIndex::new());
        let llm = Arc::new(MockLlmClient::new("Mock summary of the document."));

        let pipeline = TextExtractionPipeline::new(
            Box::new(PdfTextExtractor),
            Box::new(MockOcrEngine::new("")),
        );
        let summarizer = DocumentSummarizer::new(llm.clone(), "llama3.1");
        let processor = DocumentProcessor::new(pipeline, summarizer, index.clone());

        let ctx = ApiContext {
            processor: Arc::new(processor),
            qa: Arc::new(DocumentQa::new(llm.clone(), "llama3.1", index.clone())),
            db: Arc::new(Mutex::new(open_memory_database().unwrap())),
            store: Arc::new(UploadStore::new(dir.path().join("uploads")).unwrap()),
            llm: llm.clone(),
            llm_model: "llama3.1".into(),
        };
        (
            ctx,
            TestHandles {
                index,
                llm,
                _dir: dir,
            },
        )
    }

    /// Index two documents directly, bypassing the registry.
    pub fn seed_index(handles: &TestHandles) {
        for (filename, summary, content) in [
            ("invoice.pdf", "Invoice for March consulting", "hours billed"),
            ("lease.pdf", "", "Lease agreement for the office"),
        ] {
            handles
                .index
                .index_document(&IndexedDocument {
                    filename: filename.into(),
                    path: format!("/data/{filename}"),
                    content: content.into(),
                    summary: summary.into(),
                    author: "Unknown".into(),
                    number_of_pages: 1,
                    created_date: None,
                    language: "en".into(),
                    extraction_stage: "STRUCTURED".into(),
                    upload_date: "2024-03-01T10:00:00Z".into(),
                })
                .unwrap();
        }
    }

    /// `multipart/form-data` request with one `file` part per entry.
    pub fn multipart_request(uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }
}

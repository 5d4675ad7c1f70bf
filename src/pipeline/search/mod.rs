pub mod elasticsearch;
pub mod mock;

pub use elasticsearch::*;
pub use mock::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the index holding uploaded documents.
pub const DEFAULT_INDEX: &str = "pdf_documents";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search service is not reachable at {0}")]
    Connection(String),

    #[error("Search service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Invalid search service URL: {0}")]
    InvalidUrl(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Flat record stored in the search index, keyed by filename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    pub filename: String,
    pub path: String,
    pub content: String,
    pub summary: String,
    pub author: String,
    pub number_of_pages: u32,
    /// PDF creation date, RFC 3339, when the document declares one.
    pub created_date: Option<String>,
    pub language: String,
    pub extraction_stage: String,
    /// RFC 3339 UTC.
    pub upload_date: String,
}

/// One ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub filename: String,
    pub path: String,
    pub summary: String,
    pub content: String,
    pub language: String,
    pub score: f64,
    /// Highlighted fragments from content and summary.
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Full-text index over uploaded documents.
pub trait SearchIndex {
    /// Whether the service answers at all.
    fn ping(&self) -> bool;

    /// Create the index with its analyzers if it does not exist yet.
    fn ensure_index(&self) -> Result<(), SearchError>;

    /// Insert or replace the record for `doc.filename`.
    fn index_document(&self, doc: &IndexedDocument) -> Result<(), SearchError>;

    /// Broad search: boosted fuzzy fields, phrase prefix, and substring match.
    fn search(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Narrow relevance search over filename, summary and content, used to
    /// pick question-answering context.
    fn top_matches(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Remove every record for `filename`; returns how many were removed.
    fn delete(&self, filename: &str) -> Result<u64, SearchError>;

    /// Remove all records; returns how many were removed.
    fn clear(&self) -> Result<u64, SearchError>;

    /// Name of the index in use.
    fn index_name(&self) -> &str;
}

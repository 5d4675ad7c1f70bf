//! Document processing orchestrator.
//!
//! Drives an upload through the whole pipeline:
//! validate → store → register → extract → summarize → index → record.
//!
//! Collaborators are injected as trait objects so the orchestrator runs
//! against mocks in tests. The registry connection is locked per step,
//! never across extraction or model calls.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{self, DatabaseError, DocumentAnalysisRecord, StoredDocument};
use crate::pipeline::extraction::{DocumentSource, SourceStage, TextExtractionPipeline};
use crate::pipeline::import::{
    hash_bytes, read_metadata, sanitize_filename, validate_pdf_upload, ImportError, PdfMetadata,
    UploadStore,
};
use crate::pipeline::language_detect::Language;
use crate::pipeline::search::{IndexedDocument, SearchError, SearchIndex};
use crate::pipeline::summarize::{truncate_chars, DocumentSummarizer, SummarySource};

/// Characters of extracted text kept as the document preview.
pub const PREVIEW_CHARS: usize = 1000;

/// Indexed in place of the text when nothing could be extracted.
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "(empty document)";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Search index error: {0}")]
    Search(#[from] SearchError),

    #[error("{filename} has the same content as {existing}")]
    DuplicateContent { filename: String, existing: String },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Registry lock poisoned")]
    LockPoisoned,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub filename: String,
    pub stage: SourceStage,
    pub chars: usize,
    pub warnings: Vec<String>,
    pub language: Language,
    pub summary: String,
    pub summary_source: SummarySource,
    pub preview: String,
    pub metadata: PdfMetadata,
    /// False when the search index was unreachable or rejected the document.
    pub indexed: bool,
}

/// Result of dropping registry entries whose file disappeared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    /// Removed from the registry, but the index entry could not be deleted.
    pub failed: Vec<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct DocumentProcessor {
    pipeline: TextExtractionPipeline,
    summarizer: DocumentSummarizer,
    index: Arc<dyn SearchIndex + Send + Sync>,
}

impl DocumentProcessor {
    pub fn new(
        pipeline: TextExtractionPipeline,
        summarizer: DocumentSummarizer,
        index: Arc<dyn SearchIndex + Send + Sync>,
    ) -> Self {
        Self {
            pipeline,
            summarizer,
            index,
        }
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex + Send + Sync> {
        &self.index
    }

    /// Validate, store and register an upload, then process it.
    ///
    /// Duplicates (same sanitized filename, or same bytes under another
    /// name) are rejected before anything is written.
    pub fn ingest(
        &self,
        db: &Mutex<Connection>,
        store: &UploadStore,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let stored = self.accept_upload(db, store, original_name, bytes)?;
        let outcome = self.process(&stored.filename, Path::new(&stored.filepath));
        record_outcome(&*lock(db)?, &outcome)?;
        Ok(outcome)
    }

    fn accept_upload(
        &self,
        db: &Mutex<Connection>,
        store: &UploadStore,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredDocument, ProcessingError> {
        let filename = sanitize_filename(original_name);
        validate_pdf_upload(&filename, bytes)?;

        let conn = lock(db)?;
        if db::get_document(&conn, &filename)?.is_some() || store.exists(&filename) {
            return Err(ImportError::AlreadyExists(filename).into());
        }

        let content_hash = hash_bytes(bytes);
        if let Some(existing) = db::find_by_hash(&conn, &content_hash)? {
            return Err(ProcessingError::DuplicateContent {
                filename,
                existing: existing.filename,
            });
        }

        let path = store.save(&filename, bytes)?;
        match db::add_document(&conn, &filename, &path, Some(&content_hash)) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                if let Err(cleanup) = store.remove(&filename) {
                    warn!(filename = %filename, error = %cleanup, "Could not remove unregistered upload");
                }
                Err(e.into())
            }
        }
    }

    /// Extract, summarize and index one stored PDF. Never fails: an
    /// unreadable document is indexed with placeholder content and an
    /// unreachable index only clears `indexed`.
    pub fn process(&self, filename: &str, path: &Path) -> ProcessingOutcome {
        let extraction = self.pipeline.extract(DocumentSource::Path(path));
        for warning in extraction.warnings() {
            warn!(document = %filename, warning = %warning, "Extraction warning");
        }

        let stage = extraction.source_stage();
        let chars = extraction.char_count();
        let warnings = extraction.warnings().to_vec();
        let text = extraction.into_text();

        let analysis = self.summarizer.analyze(&text);
        let metadata = read_metadata(DocumentSource::Path(path));
        let preview = truncate_chars(&text, PREVIEW_CHARS).to_string();

        let record = IndexedDocument {
            filename: filename.to_string(),
            path: path.to_string_lossy().into_owned(),
            content: if text.trim().is_empty() {
                EMPTY_CONTENT_PLACEHOLDER.to_string()
            } else {
                text
            },
            summary: analysis.summary.clone(),
            author: metadata.author.clone(),
            number_of_pages: metadata.number_of_pages,
            created_date: metadata.created_date.clone(),
            language: analysis.language.code().to_string(),
            extraction_stage: stage.as_str().to_string(),
            upload_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let indexed = self.index_record(&record);

        info!(
            document = %filename,
            stage = stage.as_str(),
            chars,
            language = %analysis.language,
            indexed,
            "Document processed"
        );

        ProcessingOutcome {
            filename: filename.to_string(),
            stage,
            chars,
            warnings,
            language: analysis.language,
            summary: analysis.summary,
            summary_source: analysis.source,
            preview,
            metadata,
            indexed,
        }
    }

    fn index_record(&self, record: &IndexedDocument) -> bool {
        if !self.index.ping() {
            warn!(document = %record.filename, "Search index unreachable, document not indexed");
            return false;
        }
        match self.index.index_document(record) {
            Ok(()) => true,
            Err(e) => {
                warn!(document = %record.filename, error = %e, "Indexing failed");
                false
            }
        }
    }

    /// Delete the file, its registry row and its index entry.
    pub fn remove(
        &self,
        db: &Mutex<Connection>,
        store: &UploadStore,
        filename: &str,
    ) -> Result<(), ProcessingError> {
        let conn = lock(db)?;
        let stored = db::get_document(&conn, filename)?
            .ok_or_else(|| ProcessingError::NotFound(filename.to_string()))?;

        store.remove(&stored.filename)?;
        db::delete_document(&conn, &stored.filename)?;
        drop(conn);

        if let Err(e) = self.index.delete(&stored.filename) {
            warn!(document = %stored.filename, error = %e, "Index entry not removed");
        }
        info!(document = %stored.filename, "Document deleted");
        Ok(())
    }

    /// Re-run every registered document whose file still exists and index
    /// it again. Returns how many were indexed.
    pub fn reindex_all(&self, db: &Mutex<Connection>) -> Result<usize, ProcessingError> {
        self.index.ensure_index()?;
        let documents = db::list_documents(&*lock(db)?)?;

        let mut indexed = 0;
        for doc in documents {
            let path = PathBuf::from(&doc.filepath);
            if !path.is_file() {
                warn!(document = %doc.filename, "Skipping reindex, file missing on disk");
                continue;
            }
            let outcome = self.process(&doc.filename, &path);
            record_outcome(&*lock(db)?, &outcome)?;
            if outcome.indexed {
                indexed += 1;
            }
        }
        info!(indexed, "Reindex complete");
        Ok(indexed)
    }

    /// Drop registry rows and index entries for files gone from disk.
    pub fn cleanup_missing(&self, db: &Mutex<Connection>) -> Result<CleanupReport, ProcessingError> {
        let missing = db::cleanup_missing_files(&*lock(db)?)?;

        let mut report = CleanupReport::default();
        for doc in missing {
            match self.index.delete(&doc.filename) {
                Ok(_) => report.removed.push(doc.filename),
                Err(e) => {
                    warn!(document = %doc.filename, error = %e, "Index entry not removed");
                    report.failed.push(doc.filename);
                }
            }
        }
        Ok(report)
    }
}

/// Write the analysis of a processed document back to its registry row.
pub fn record_outcome(conn: &Connection, outcome: &ProcessingOutcome) -> Result<(), DatabaseError> {
    db::record_analysis(
        conn,
        &outcome.filename,
        &DocumentAnalysisRecord {
            preview: &outcome.preview,
            summary: &outcome.summary,
            language: outcome.language.code(),
            extraction_stage: outcome.stage.as_str(),
        },
    )
}

pub(crate) fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, ProcessingError> {
    db.lock().map_err(|_| ProcessingError::LockPoisoned)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::DatabaseError;

/// One registered upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub filename: String,
    pub filepath: String,
    pub content_hash: Option<String>,
    /// RFC 3339 UTC.
    pub uploaded_at: String,
    pub preview: String,
    pub summary: String,
    pub language: String,
    pub extraction_stage: String,
}

/// Analysis fields written back once a document has been processed.
#[derive(Debug, Clone, Copy)]
pub struct DocumentAnalysisRecord<'a> {
    pub preview: &'a str,
    pub summary: &'a str,
    pub language: &'a str,
    pub extraction_stage: &'a str,
}

const COLUMNS: &str = "filename, filepath, content_hash, uploaded_at, preview, summary, language, extraction_stage";

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        filename: row.get(0)?,
        filepath: row.get(1)?,
        content_hash: row.get(2)?,
        uploaded_at: row.get(3)?,
        preview: row.get(4)?,
        summary: row.get(5)?,
        language: row.get(6)?,
        extraction_stage: row.get(7)?,
    })
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Register an upload. A row with the same filename is replaced.
pub fn add_document(
    conn: &Connection,
    filename: &str,
    filepath: &Path,
    content_hash: Option<&str>,
) -> Result<StoredDocument, DatabaseError> {
    let filepath = filepath.to_string_lossy().into_owned();
    let uploaded_at = now_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO documents (filename, filepath, content_hash, uploaded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![filename, filepath, content_hash, uploaded_at],
    )?;
    tracing::debug!(filename, "Registered document");

    get_document(conn, filename)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Document".into(),
        id: filename.to_string(),
    })
}

pub fn record_analysis(
    conn: &Connection,
    filename: &str,
    analysis: &DocumentAnalysisRecord<'_>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE documents SET preview = ?2, summary = ?3, language = ?4, extraction_stage = ?5
         WHERE filename = ?1",
        params![
            filename,
            analysis.preview,
            analysis.summary,
            analysis.language,
            analysis.extraction_stage,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: filename.to_string(),
        });
    }
    Ok(())
}

/// Newest uploads first.
pub fn list_documents(conn: &Connection) -> Result<Vec<StoredDocument>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM documents ORDER BY uploaded_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], document_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_document(
    conn: &Connection,
    filename: &str,
) -> Result<Option<StoredDocument>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {COLUMNS} FROM documents WHERE filename = ?1"),
        params![filename],
        document_from_row,
    );
    match result {
        Ok(doc) => Ok(Some(doc)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_by_hash(
    conn: &Connection,
    content_hash: &str,
) -> Result<Option<StoredDocument>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {COLUMNS} FROM documents WHERE content_hash = ?1 LIMIT 1"),
        params![content_hash],
        document_from_row,
    );
    match result {
        Ok(doc) => Ok(Some(doc)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Returns false when no row matched.
pub fn delete_document(conn: &Connection, filename: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM documents WHERE filename = ?1", params![filename])?;
    Ok(deleted > 0)
}

/// Drop rows whose file is gone from disk and return them.
pub fn cleanup_missing_files(conn: &Connection) -> Result<Vec<StoredDocument>, DatabaseError> {
    let missing: Vec<StoredDocument> = list_documents(conn)?
        .into_iter()
        .filter(|doc| !Path::new(&doc.filepath).is_file())
        .collect();

    for doc in &missing {
        delete_document(conn, &doc.filename)?;
        tracing::info!(filename = %doc.filename, "Removed registry entry for missing file");
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    #[test]
    fn add_and_get() {
        let conn = test_db();
        let doc = add_document(&conn, "a.pdf", Path::new("/data/a.pdf"), Some("hash-a")).unwrap();
        assert_eq!(doc.filename, "a.pdf");
        assert_eq!(doc.filepath, "/data/a.pdf");
        assert_eq!(doc.language, "unknown");
        assert_eq!(doc.extraction_stage, "EMPTY");
        assert!(doc.uploaded_at.ends_with('Z'));

        assert_eq!(get_document(&conn, "a.pdf").unwrap(), Some(doc));
        assert_eq!(get_document(&conn, "b.pdf").unwrap(), None);
    }

    #[test]
    fn add_replaces_same_filename() {
        let conn = test_db();
        add_document(&conn, "a.pdf", Path::new("/old/a.pdf"), None).unwrap();
        add_document(&conn, "a.pdf", Path::new("/new/a.pdf"), None).unwrap();
        let docs = list_documents(&conn).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].filepath, "/new/a.pdf");
    }

    #[test]
    fn list_newest_first() {
        let conn = test_db();
        add_document(&conn, "first.pdf", Path::new("/d/first.pdf"), None).unwrap();
        add_document(&conn, "second.pdf", Path::new("/d/second.pdf"), None).unwrap();
        let names: Vec<String> = list_documents(&conn)
            .unwrap()
            .into_iter()
            .map(|d| d.filename)
            .collect();
        assert_eq!(names, vec!["second.pdf", "first.pdf"]);
    }

    #[test]
    fn find_by_content_hash() {
        let conn = test_db();
        add_document(&conn, "a.pdf", Path::new("/d/a.pdf"), Some("abc")).unwrap();
        assert_eq!(find_by_hash(&conn, "abc").unwrap().unwrap().filename, "a.pdf");
        assert!(find_by_hash(&conn, "zzz").unwrap().is_none());
    }

    #[test]
    fn record_analysis_updates_fields() {
        let conn = test_db();
        add_document(&conn, "a.pdf", Path::new("/d/a.pdf"), None).unwrap();
        let analysis = DocumentAnalysisRecord {
            preview: "Invoice no. 7",
            summary: "An invoice.",
            language: "en",
            extraction_stage: "STRUCTURED",
        };
        record_analysis(&conn, "a.pdf", &analysis).unwrap();

        let doc = get_document(&conn, "a.pdf").unwrap().unwrap();
        assert_eq!(doc.summary, "An invoice.");
        assert_eq!(doc.language, "en");
        assert_eq!(doc.extraction_stage, "STRUCTURED");

        let err = record_analysis(&conn, "missing.pdf", &analysis).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn delete_reports_match() {
        let conn = test_db();
        add_document(&conn, "a.pdf", Path::new("/d/a.pdf"), None).unwrap();
        assert!(delete_document(&conn, "a.pdf").unwrap());
        assert!(!delete_document(&conn, "a.pdf").unwrap());
    }

    #[test]
    fn cleanup_removes_only_missing_files() {
        let conn = test_db();
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.pdf");
        std::fs::write(&present, b"%PDF-1.4").unwrap();

        add_document(&conn, "present.pdf", &present, None).unwrap();
        add_document(&conn, "gone.pdf", &dir.path().join("gone.pdf"), None).unwrap();

        let removed = cleanup_missing_files(&conn).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].filename, "gone.pdf");

        let remaining = list_documents(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].filename, "present.pdf");
    }
}

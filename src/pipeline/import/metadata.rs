//! Document-info metadata (author, page count, creation date) for the
//! search index.

use chrono::{NaiveDateTime, SecondsFormat};
use lopdf::{Document, Object};
use serde::Serialize;
use tracing::debug;

use crate::pipeline::extraction::DocumentSource;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfMetadata {
    pub author: String,
    pub number_of_pages: u32,
    /// RFC 3339, UTC.
    pub created_date: Option<String>,
}

impl Default for PdfMetadata {
    fn default() -> Self {
        Self {
            author: "Unknown".to_string(),
            number_of_pages: 0,
            created_date: None,
        }
    }
}

/// Read the info dictionary. Unreadable documents get the defaults.
pub fn read_metadata(source: DocumentSource<'_>) -> PdfMetadata {
    let loaded = match source {
        DocumentSource::Bytes(bytes) => Document::load_mem(bytes),
        DocumentSource::Path(path) => Document::load(path),
    };
    let doc = match loaded {
        Ok(doc) => doc,
        Err(e) => {
            debug!(source = %source.describe(), error = %e, "No readable PDF metadata");
            return PdfMetadata::default();
        }
    };

    let mut meta = PdfMetadata {
        number_of_pages: doc.get_pages().len() as u32,
        ..PdfMetadata::default()
    };

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_dict().ok());

    if let Some(info) = info {
        if let Some(author) = info.get(b"Author").ok().and_then(text_string) {
            if !author.trim().is_empty() {
                meta.author = author.trim().to_string();
            }
        }
        meta.created_date = info
            .get(b"CreationDate")
            .ok()
            .and_then(text_string)
            .and_then(|d| parse_pdf_date(&d));
    }
    meta
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with a BOM, otherwise
/// treated as Latin-1.
fn text_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return Some(String::from_utf8_lossy(utf8).into_owned());
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Parse `D:YYYYMMDDHHmmSS...`; the timezone suffix is ignored.
pub fn parse_pdf_date(raw: &str) -> Option<String> {
    let digits = raw.trim().strip_prefix("D:")?;
    let stamp = digits.get(..14)?;
    let parsed = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;
    Some(parsed.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use lopdf::{dictionary, StringFormat};

    use super::*;
    use crate::pipeline::extraction::pdf::test_pdfs::text_pdf;

    fn with_info(author: Object, created: &str) -> Vec<u8> {
        let mut doc = Document::load_mem(&text_pdf(&["one", "two"])).unwrap();
        let info_id = doc.add_object(dictionary! {
            "Author" => author,
            "CreationDate" => Object::String(created.as_bytes().to_vec(), StringFormat::Literal),
        });
        doc.trailer.set("Info", info_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn reads_author_pages_and_date() {
        let pdf = with_info(
            Object::String(b"Jan Kowalski".to_vec(), StringFormat::Literal),
            "D:20240115103000+01'00'",
        );
        let meta = read_metadata(DocumentSource::Bytes(&pdf));
        assert_eq!(meta.author, "Jan Kowalski");
        assert_eq!(meta.number_of_pages, 2);
        assert_eq!(meta.created_date.as_deref(), Some("2024-01-15T10:30:00Z"));
    }

    #[test]
    fn decodes_utf16_author() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Łukasz".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let pdf = with_info(Object::String(bytes, StringFormat::Hexadecimal), "garbage");
        let meta = read_metadata(DocumentSource::Bytes(&pdf));
        assert_eq!(meta.author, "Łukasz");
        assert_eq!(meta.created_date, None);
    }

    #[test]
    fn missing_info_keeps_defaults() {
        let pdf = text_pdf(&["only page"]);
        let meta = read_metadata(DocumentSource::Bytes(&pdf));
        assert_eq!(meta.author, "Unknown");
        assert_eq!(meta.number_of_pages, 1);
    }

    #[test]
    fn garbage_gets_defaults() {
        assert_eq!(read_metadata(DocumentSource::Bytes(b"not a pdf")), PdfMetadata::default());
    }

    #[test]
    fn pdf_dates() {
        assert_eq!(
            parse_pdf_date("D:19991231235959Z").as_deref(),
            Some("1999-12-31T23:59:59Z")
        );
        assert_eq!(parse_pdf_date("D:2024"), None);
        assert_eq!(parse_pdf_date("20240115103000"), None);
    }
}

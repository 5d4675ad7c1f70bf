//! Per-page encoding repair for the structured stage.
//!
//! Text layers built from single-byte fonts often come back as Latin-1
//! code points standing in for bytes of another encoding (cp1250 for Polish
//! producers, or UTF-8 read byte by byte). Each page is checked on its own
//! and re-decoded only when the page looks like such a byte string.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use super::ExtractionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    Unchanged,
    Repaired {
        encoding: &'static str,
        text: String,
    },
}

/// Re-decode `text` if all of its characters fit in one byte and the byte
/// string reads as another encoding.
///
/// Pages with any character above U+00FF are already genuine Unicode and
/// are never touched.
pub fn repair_page_encoding(page: usize, text: &str) -> Result<RepairOutcome, ExtractionError> {
    let Some(bytes) = as_single_bytes(text) else {
        return Ok(RepairOutcome::Unchanged);
    };
    if bytes.is_ascii() {
        return Ok(RepairOutcome::Unchanged);
    }

    if let Ok(utf8) = std::str::from_utf8(&bytes) {
        return Ok(RepairOutcome::Repaired {
            encoding: UTF_8.name(),
            text: utf8.to_string(),
        });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(&bytes, true);
    let encoding: &'static Encoding = detector.guess(None, false);

    // A leading byte-order mark overrides the guess.
    let (decoded, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(ExtractionError::EncodingRepairFailure {
            page,
            reason: format!("bytes are not valid {}", used.name()),
        });
    }
    if decoded == text {
        return Ok(RepairOutcome::Unchanged);
    }

    Ok(RepairOutcome::Repaired {
        encoding: used.name(),
        text: decoded.into_owned(),
    })
}

fn as_single_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

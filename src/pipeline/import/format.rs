use std::path::Path;

use super::ImportError;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB

/// PDF readers accept the `%PDF-` header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// True when the bytes carry a PDF header.
/// Magic bytes decide; the extension is checked separately.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// True when the name ends in `.pdf`, in any case.
pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Accept an upload only if it is named and shaped like a PDF and fits the
/// size limit.
pub fn validate_pdf_upload(filename: &str, bytes: &[u8]) -> Result<(), ImportError> {
    if !has_pdf_extension(filename) {
        return Err(ImportError::NotAPdf(filename.to_string()));
    }
    if bytes.is_empty() {
        return Err(ImportError::EmptyFile(filename.to_string()));
    }
    let size = bytes.len() as u64;
    if size > MAX_FILE_SIZE {
        return Err(ImportError::FileTooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            max_mb: MAX_FILE_SIZE / (1024 * 1024),
        });
    }
    if !has_pdf_header(bytes) {
        return Err(ImportError::NotAPdf(filename.to_string()));
    }
    Ok(())
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let normalized = original.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\'))
        .take(255)
        .collect();
    let clean = clean.trim();

    if clean.is_empty() || clean == "." || clean == ".." {
        "document".to_string()
    } else {
        clean.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_header_detected() {
        assert!(has_pdf_header(b"%PDF-1.7\n..."));
        assert!(has_pdf_header(b"\xEF\xBB\xBF%PDF-1.4"));
        assert!(!has_pdf_header(b"not a pdf"));
        assert!(!has_pdf_header(b""));
    }

    #[test]
    fn header_after_first_kilobyte_is_ignored() {
        let mut bytes = vec![b' '; 2048];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(!has_pdf_header(&bytes));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_pdf_extension("Raport.PDF"));
        assert!(has_pdf_extension("scan.pdf"));
        assert!(!has_pdf_extension("notes.txt"));
        assert!(!has_pdf_extension("pdf"));
    }

    #[test]
    fn wrong_extension_rejected() {
        let err = validate_pdf_upload("image.jpg", b"%PDF-1.4").unwrap_err();
        assert!(matches!(err, ImportError::NotAPdf(_)));
    }

    #[test]
    fn wrong_content_rejected() {
        // JPEG content with .pdf extension
        let err = validate_pdf_upload("misleading.pdf", &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap_err();
        assert!(matches!(err, ImportError::NotAPdf(_)));
    }

    #[test]
    fn empty_upload_rejected() {
        assert!(matches!(
            validate_pdf_upload("empty.pdf", b""),
            Err(ImportError::EmptyFile(_))
        ));
    }

    #[test]
    fn valid_upload_accepted() {
        assert!(validate_pdf_upload("ok.pdf", b"%PDF-1.4 rest").is_ok());
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\scan.pdf"), "scan.pdf");
        assert_eq!(sanitize_filename("normal_file.pdf"), "normal_file.pdf");
        assert_eq!(sanitize_filename(""), "document");
        assert_eq!(sanitize_filename(".."), "document");
        assert_eq!(sanitize_filename("file\0name.pdf"), "filename.pdf");
    }

    #[test]
    fn sanitize_preserves_unicode_names() {
        assert_eq!(sanitize_filename("Umowa najmu (1).pdf"), "Umowa najmu (1).pdf");
        assert_eq!(sanitize_filename("zażółć.pdf"), "zażółć.pdf");
    }
}

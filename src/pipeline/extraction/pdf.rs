use std::panic::{catch_unwind, AssertUnwindSafe};

use super::types::{DocumentSource, PdfTextLayer};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Reads the embedded text layer of digital PDFs, one string per page.
pub struct PdfTextExtractor;

impl PdfTextLayer for PdfTextExtractor {
    fn extract_pages(&self, source: &DocumentSource<'_>) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed fonts and content streams
        let outcome = catch_unwind(AssertUnwindSafe(|| match *source {
            DocumentSource::Bytes(bytes) => pdf_extract::extract_text_from_mem_by_pages(bytes),
            DocumentSource::Path(path) => pdf_extract::extract_text_by_pages(path),
        }));

        match outcome {
            Ok(Ok(pages)) if pages.is_empty() => Err(ExtractionError::ParseFailure(
                "document has no pages".into(),
            )),
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(ExtractionError::ParseFailure(e.to_string())),
            Err(panic) => Err(ExtractionError::ParseFailure(format!(
                "text extractor panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
pub(crate) mod test_pdfs {
    use lopdf::dictionary;
    use lopdf::{Document, Object, ObjectId, Stream};

    /// Build a PDF with one Helvetica text line per page.
    pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            page_ids.push(page_id);
        }
        finish(doc, page_ids)
    }

    /// Build a PDF whose pages only paint a grayscale image, with no text layer.
    pub fn image_only_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let (width, height) = (64u32, 32u32);

        let mut page_ids = Vec::new();
        for i in 0..page_count {
            let shade = 40u8.wrapping_add((i as u8).wrapping_mul(60));
            let pixels = vec![shade; (width * height) as usize];
            let mut image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                pixels,
            );
            image.allows_compression = false;
            let image_id = doc.add_object(image);

            let content = b"q 200 0 0 100 100 600 cm /Im1 Do Q".to_vec();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im1" => image_id },
                },
            });
            page_ids.push(page_id);
        }
        finish(doc, page_ids)
    }

    fn finish(mut doc: Document, page_ids: Vec<ObjectId>) -> Vec<u8> {
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        });
        for page_id in &page_ids {
            if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(*page_id) {
                dict.set("Parent", pages_id);
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

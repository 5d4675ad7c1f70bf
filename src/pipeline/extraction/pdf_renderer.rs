//! Pure-Rust page "rasterizer" for scanned PDFs.
//!
//! A scanned page is normally one image XObject painted over the whole
//! page. Pulling that image out with lopdf gives the OCR stage something to
//! read when the PDFium library is not installed.

use image::ImageOutputFormat;
use lopdf::{Document, Object, ObjectId};

use super::types::{DocumentSource, PdfPageRenderer};
use super::ExtractionError;

/// Extracts the largest embedded image of each page using lopdf.
///
/// Handles JPEG (DCTDecode) streams, streams holding a complete image file,
/// and raw Gray/RGB/CMYK pixel data. Pages without an image fail with
/// `RasterizationFailure`.
pub struct LopdfImageExtractor;

fn load_document(source: &DocumentSource<'_>) -> Result<Document, ExtractionError> {
    match *source {
        DocumentSource::Bytes(bytes) => Document::load_mem(bytes),
        DocumentSource::Path(path) => Document::load(path),
    }
    .map_err(|e| ExtractionError::ParseFailure(format!("lopdf could not load the document: {e}")))
}

impl PdfPageRenderer for LopdfImageExtractor {
    fn page_count(&self, source: &DocumentSource<'_>) -> Result<usize, ExtractionError> {
        let doc = load_document(source)?;
        Ok(doc.get_pages().len())
    }

    fn render_page(
        &self,
        source: &DocumentSource<'_>,
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let doc = load_document(source)?;
        let raster_err = |reason: String| ExtractionError::RasterizationFailure {
            page: page_index,
            reason,
        };

        let page_ids: Vec<ObjectId> = doc.page_iter().collect();
        let &page_id = page_ids.get(page_index).ok_or_else(|| {
            raster_err(format!("page not found (PDF has {} pages)", page_ids.len()))
        })?;

        let image_bytes = extract_largest_page_image(&doc, page_id).map_err(raster_err)?;

        // Validate and re-encode to PNG for the OCR engine
        let img = image::load_from_memory(&image_bytes)
            .map_err(|e| raster_err(format!("failed to decode extracted image: {e}")))?;

        let mut png_buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png_buf, ImageOutputFormat::Png)
            .map_err(|e| raster_err(format!("failed to encode PNG: {e}")))?;

        tracing::debug!(
            page = page_index,
            raw_size = image_bytes.len(),
            png_size = png_buf.get_ref().len(),
            "Extracted image from PDF page"
        );

        Ok(png_buf.into_inner())
    }
}

/// Walk page dict → /Resources → /XObject and return the bytes of the
/// largest image found.
fn extract_largest_page_image(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, String> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("page object error: {e}"))?;

    let resources = resolve_dict_entry(doc, page_dict, b"Resources")?;
    let xobjects = resolve_dict_entry(doc, resources, b"XObject")?;

    let mut largest: Option<Vec<u8>> = None;

    for (_name, obj_ref) in xobjects.iter() {
        let stream = match resolve_object(doc, obj_ref) {
            Object::Stream(s) => s,
            _ => continue,
        };
        if !is_image_subtype(&stream.dict) {
            continue;
        }

        let image_bytes = extract_image_bytes(doc, stream)?;
        if largest.as_ref().map_or(true, |prev| image_bytes.len() > prev.len()) {
            largest = Some(image_bytes);
        }
    }

    largest.ok_or_else(|| "no image XObjects on this page".to_string())
}

fn is_image_subtype(dict: &lopdf::Dictionary) -> bool {
    dict.get(b"Subtype")
        .map(|obj| matches!(obj, Object::Name(ref n) if n == b"Image"))
        .unwrap_or(false)
}

fn extract_image_bytes(doc: &Document, stream: &lopdf::Stream) -> Result<Vec<u8>, String> {
    let is_dct = match stream.dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == b"DCTDecode",
        Ok(Object::Array(arr)) => arr
            .iter()
            .any(|o| matches!(o, Object::Name(ref n) if n == b"DCTDecode")),
        _ => false,
    };

    if is_dct {
        // DCTDecode streams are complete JPEG files; lopdf leaves them as-is
        return Ok(stream.content.clone());
    }

    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    // Some producers embed a whole TIFF or PNG file in the stream
    if image::load_from_memory(&content).is_ok() {
        return Ok(content);
    }

    reconstruct_raw_image(doc, &stream.dict, &content)
}

/// Rebuild an image from raw samples using /Width, /Height,
/// /BitsPerComponent and /ColorSpace.
fn reconstruct_raw_image(
    doc: &Document,
    dict: &lopdf::Dictionary,
    raw_pixels: &[u8],
) -> Result<Vec<u8>, String> {
    let width = get_int(dict, b"Width")? as u32;
    let height = get_int(dict, b"Height")? as u32;
    let bpc = get_int(dict, b"BitsPerComponent").unwrap_or(8) as u32;
    if bpc != 8 {
        return Err(format!("unsupported BitsPerComponent {bpc}"));
    }

    let channels = determine_channels(doc, dict);
    let expected_size = (width as usize) * (height as usize) * (channels as usize);
    if raw_pixels.len() < expected_size {
        return Err(format!(
            "raw pixel buffer too small: {} bytes, expected {expected_size} ({width}x{height}x{channels})",
            raw_pixels.len()
        ));
    }
    let pixels = raw_pixels[..expected_size].to_vec();

    let img = match channels {
        1 => image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8),
        // CMYK samples are read as RGBA; color accuracy does not matter for OCR
        4 => image::RgbaImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgba8),
        _ => return Err(format!("unsupported channel count: {channels}")),
    }
    .ok_or_else(|| format!("could not build a {channels}-channel image"))?;

    let mut png_buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png_buf, ImageOutputFormat::Png)
        .map_err(|e| format!("PNG encode failed: {e}"))?;
    Ok(png_buf.into_inner())
}

fn determine_channels(doc: &Document, dict: &lopdf::Dictionary) -> u32 {
    let cs = match dict.get(b"ColorSpace") {
        Ok(obj) => resolve_object(doc, obj),
        Err(_) => return 3,
    };

    match cs {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"CalGray" => 1,
            b"DeviceCMYK" => 4,
            _ => 3,
        },
        Object::Array(arr) => match arr.first() {
            Some(Object::Name(n)) if n == b"ICCBased" => arr
                .get(1)
                .map(|obj| resolve_object(doc, obj))
                .and_then(|obj| obj.as_stream().ok())
                .and_then(|s| get_int(&s.dict, b"N").ok())
                .map(|n| n as u32)
                .unwrap_or(3),
            Some(Object::Name(n)) if n == b"Indexed" => 1,
            _ => 3,
        },
        _ => 3,
    }
}

/// Follow a reference to its target, or return the object as-is.
fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict_entry<'a>(
    doc: &'a Document,
    dict: &'a lopdf::Dictionary,
    key: &[u8],
) -> Result<&'a lopdf::Dictionary, String> {
    let name = String::from_utf8_lossy(key);
    let obj = dict.get(key).map_err(|_| format!("missing /{name}"))?;
    resolve_object(doc, obj)
        .as_dict()
        .map_err(|_| format!("/{name} is not a dictionary"))
}

fn get_int(dict: &lopdf::Dictionary, key: &[u8]) -> Result<i64, String> {
    let name = String::from_utf8_lossy(key);
    dict.get(key)
        .map_err(|_| format!("missing /{name} in image dictionary"))?
        .as_i64()
        .map_err(|_| format!("/{name} is not an integer"))
}

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Tesseract driven through its command-line binary.
///
/// Each page image goes to a scoped temp file that is removed when the
/// call returns, on success or failure. Output is requested as TSV so the
/// engine's per-word confidence is available alongside the text.
pub struct TesseractCli {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
        }
    }
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            tessdata_dir: None,
        }
    }

    pub fn with_tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    /// True when the binary runs and reports a version.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let image = tempfile::Builder::new()
            .prefix("docfinder-ocr-")
            .suffix(".png")
            .tempfile()?;
        std::fs::write(image.path(), image_bytes)?;

        let mut command = Command::new(&self.binary);
        command.arg(image.path()).arg("stdout").arg("-l").arg(lang);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        command.arg("tsv");

        let output = command.output().map_err(|e| {
            ExtractionError::OcrInit(format!("cannot run {}: {e}", self.binary.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize with a tessdata directory holding at least `eng.traineddata`.
    pub fn new(tessdata_dir: &std::path::Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
        }
        if !tessdata_dir.join("pol.traineddata").exists() {
            tracing::warn!(
                dir = %tessdata_dir.display(),
                "pol.traineddata missing, Polish pages will be recognized poorly"
            );
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let tessdata_str = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata_str), Some(lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrPageResult {
            text,
            confidence: Some(confidence),
        })
    }
}

/// Rebuild page text and mean word confidence from Tesseract TSV output.
///
/// TSV columns: level page_num block_num par_num line_num word_num left top
/// width height conf text. Level 5 rows are words; a change of
/// (block, paragraph, line) starts a new output line.
fn parse_tsv(tsv: &str) -> OcrPageResult {
    let mut text = String::new();
    let mut current_line: Option<(&str, &str, &str)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_words = 0usize;

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let line_key = (fields[2], fields[3], fields[4]);
        match current_line {
            Some(key) if key == line_key => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line_key);
        text.push_str(word);

        // Tesseract reports -1 for words it can't assign confidence to
        if let Ok(conf) = fields[10].parse::<f32>() {
            if conf >= 0.0 {
                conf_sum += conf / 100.0;
                conf_words += 1;
            }
        }
    }

    OcrPageResult {
        text,
        confidence: (conf_words > 0).then(|| conf_sum / conf_words as f32),
    }
}

/// Mock OCR engine for unit testing without Tesseract.
///
/// Returns the configured page texts in call order (the last one repeats),
/// optionally failing on selected calls, and remembers the language list it
/// was asked for.
pub struct MockOcrEngine {
    pages: Vec<String>,
    failing_calls: Vec<usize>,
    calls: AtomicUsize,
    last_lang: Mutex<Option<String>>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self::with_pages(&[text])
    }

    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            failing_calls: Vec::new(),
            calls: AtomicUsize::new(0),
            last_lang: Mutex::new(None),
        }
    }

    /// Fail the given 0-based calls with an engine error.
    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.to_vec();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_lang(&self) -> Option<String> {
        self.last_lang.lock().ok().and_then(|guard| guard.clone())
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image_with_lang(
        &self,
        _image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_lang.lock() {
            *guard = Some(lang.to_string());
        }
        if self.failing_calls.contains(&call) {
            return Err(ExtractionError::OcrProcessing("mock engine failure".into()));
        }
        let text = self
            .pages
            .get(call)
            .or_else(|| self.pages.last())
            .cloned()
            .unwrap_or_default();
        Ok(OcrPageResult {
            text,
            confidence: Some(0.9),
        })
    }
}

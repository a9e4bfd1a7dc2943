//! Image adapter: grayscale conversion, OCR, then the text adapter.
//!
//! OCR output is written to an intermediate `.txt` file which the text adapter reads back. Both
//! the grayscale scratch image and the intermediate text file live in the adapter's work
//! directory and are removed whether or not chunking succeeds.

use super::text::TextExtractor;
use super::{ExtractionError, Segment};
use async_trait::async_trait;
use image::ImageFormat;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

/// Optical character recognition backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the text contained in the image at `image_path`.
    async fn recognize(&self, image_path: &Path) -> Result<String, ExtractionError>;
}

/// OCR through the `tesseract` command-line tool.
pub struct TesseractCli {
    binary: String,
    language: String,
}

impl TesseractCli {
    /// Use `binary` (a path or a name on `PATH`) with the given language pack.
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|error| {
                ExtractionError::Ocr(format!("failed to run {}: {error}", self.binary))
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| ExtractionError::Ocr("tesseract produced non UTF-8 output".into()))
    }
}

/// Extracts text from raster images.
pub struct ImageExtractor {
    text: TextExtractor,
    ocr: Arc<dyn OcrEngine>,
    work_dir: PathBuf,
}

impl ImageExtractor {
    /// Create an adapter that writes scratch files under the system temp directory.
    pub fn new(text: TextExtractor, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            text,
            ocr,
            work_dir: std::env::temp_dir(),
        }
    }

    /// Override the directory used for scratch files.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Run OCR on the image at `path` and chunk the recognized text.
    ///
    /// Images without recognizable text produce no segments.
    pub async fn extract(
        &self,
        path: &Path,
        source_path: &str,
        file_name: &str,
    ) -> Result<Vec<Segment>, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::io(path, source))?;

        let work_dir = self.work_dir.clone();
        let grayscale = tokio::task::spawn_blocking(move || write_grayscale(&bytes, &work_dir))
            .await
            .map_err(|error| ExtractionError::Task(error.to_string()))?
            .map_err(|message| ExtractionError::Image {
                path: path.display().to_string(),
                message,
            })?;

        let recognized = self.ocr.recognize(grayscale.path()).await;
        discard(grayscale);
        let text = recognized?;

        if text.trim().is_empty() {
            debug!(file = file_name, "No text recognized in image");
            return Ok(Vec::new());
        }

        let intermediate = self.write_intermediate(&text)?;
        let result = self
            .text
            .extract(intermediate.path(), source_path, file_name)
            .await;
        discard(intermediate);

        let segments = result?;
        debug!(file = file_name, segments = segments.len(), "Image extracted");
        Ok(segments)
    }

    fn write_intermediate(&self, text: &str) -> Result<NamedTempFile, ExtractionError> {
        let mut file = tempfile::Builder::new()
            .prefix("docqa-ocr-")
            .suffix(".txt")
            .tempfile_in(&self.work_dir)
            .map_err(|source| ExtractionError::io(&self.work_dir, source))?;
        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| ExtractionError::io(file.path(), source))?;
        Ok(file)
    }
}

fn write_grayscale(bytes: &[u8], work_dir: &Path) -> Result<NamedTempFile, String> {
    let decoded = image::load_from_memory(bytes).map_err(|error| error.to_string())?;
    let grayscale = decoded.grayscale();
    let file = tempfile::Builder::new()
        .prefix("docqa-ocr-")
        .suffix(".png")
        .tempfile_in(work_dir)
        .map_err(|error| error.to_string())?;
    grayscale
        .save_with_format(file.path(), ImageFormat::Png)
        .map_err(|error| error.to_string())?;
    Ok(file)
}

fn discard(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(error) = file.close() {
        warn!(path = %path.display(), error = %error, "Failed to remove scratch file");
    }
}

//! Extraction adapters turning uploaded files into page-tagged text segments.
//!
//! Dispatch happens on [`SourceKind`], which callers infer from the file extension before a file
//! ever reaches this module. Each adapter chunks its medium with the section chunker in
//! [`chunking`]; the image adapter runs OCR first and then reuses the text adapter.

pub mod chunking;
pub mod image;
pub mod pdf;
pub mod text;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use self::chunking::ChunkingOptions;
pub use self::image::{ImageExtractor, OcrEngine, TesseractCli};
pub use self::pdf::PdfExtractor;
pub use self::text::TextExtractor;

/// Extensions accepted for upload, lowercase and without the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "txt", "png", "jpg", "jpeg", "webp"];

/// Media families handled by the extraction adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Portable Document Format, extracted page by page.
    Pdf,
    /// UTF-8 plain text.
    Text,
    /// Raster image, read through OCR.
    Image,
}

impl SourceKind {
    /// Infer the kind from a path's extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "png" | "jpg" | "jpeg" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    /// Stable lowercase label used in payloads and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted unit of document text with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Path the file was ingested from; part of the chunk identity.
    pub source_path: String,
    /// Base name of the uploaded file.
    pub file_name: String,
    /// 1-based page number for paged media, `None` otherwise.
    pub page_number: Option<u32>,
    /// Raw segment text.
    pub text: String,
}

/// Errors raised while extracting segments from a file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File could not be read or a scratch file could not be written.
    #[error("I/O failure on {path}: {source}")]
    Io {
        /// Path involved in the failing operation.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Text file was not valid UTF-8.
    #[error("{path} is not valid UTF-8")]
    Encoding {
        /// Offending file.
        path: String,
    },
    /// PDF parser rejected the document.
    #[error("failed to parse PDF {path}: {message}")]
    Pdf {
        /// Offending file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Image decoder rejected the file.
    #[error("failed to decode image {path}: {message}")]
    Image {
        /// Offending file.
        path: String,
        /// Decoder diagnostic.
        message: String,
    },
    /// OCR engine failed or was unavailable.
    #[error("OCR failed: {0}")]
    Ocr(String),
    /// Blocking extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(String),
}

impl ExtractionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Dispatcher owning one adapter per [`SourceKind`].
pub struct Extractors {
    text: TextExtractor,
    pdf: PdfExtractor,
    image: ImageExtractor,
}

impl Extractors {
    /// Build the adapter set sharing one chunking configuration.
    pub fn new(options: ChunkingOptions, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            text: TextExtractor::new(options.clone()),
            pdf: PdfExtractor::new(options.clone()),
            image: ImageExtractor::new(TextExtractor::new(options), ocr),
        }
    }

    /// Extract segments from `path`, whose kind has already been validated.
    pub async fn extract(
        &self,
        path: &Path,
        kind: SourceKind,
    ) -> Result<Vec<Segment>, ExtractionError> {
        let source_path = path.display().to_string();
        let file_name = file_name_of(path);
        tracing::debug!(file = %file_name, kind = %kind, "Extracting segments");
        match kind {
            SourceKind::Text => self.text.extract(path, &source_path, &file_name).await,
            SourceKind::Pdf => self.pdf.extract(path, &source_path, &file_name).await,
            SourceKind::Image => self.image.extract(path, &source_path, &file_name).await,
        }
    }
}

/// Base name of a path, falling back to the full display form.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn kind_inference_ignores_case() {
        assert_eq!(
            SourceKind::from_path(&PathBuf::from("Report.PDF")),
            Some(SourceKind::Pdf)
        );
        assert_eq!(
            SourceKind::from_path(&PathBuf::from("notes.txt")),
            Some(SourceKind::Text)
        );
        assert_eq!(
            SourceKind::from_path(&PathBuf::from("scan.JpEg")),
            Some(SourceKind::Image)
        );
    }

    #[test]
    fn unknown_extensions_have_no_kind() {
        assert_eq!(SourceKind::from_path(&PathBuf::from("tool.exe")), None);
        assert_eq!(SourceKind::from_path(&PathBuf::from("README")), None);
    }

    #[test]
    fn allow_list_matches_kind_inference() {
        for extension in ALLOWED_EXTENSIONS {
            let path = PathBuf::from(format!("file.{extension}"));
            assert!(SourceKind::from_path(&path).is_some(), "{extension}");
        }
    }
}

//! Plain-text adapter.

use super::chunking::{ChunkingOptions, chunk_page};
use super::{ExtractionError, Segment};
use std::path::Path;

/// Reads UTF-8 files and chunks them as a single unpaged page.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    options: ChunkingOptions,
}

impl TextExtractor {
    /// Create an adapter using the given chunk budgets.
    pub fn new(options: ChunkingOptions) -> Self {
        Self { options }
    }

    /// Read `path` and chunk it, attributing segments to `source_path` and `file_name`.
    ///
    /// The attribution is separate from `path` so that callers feeding a scratch file (OCR output)
    /// keep the identity of the original upload.
    pub async fn extract(
        &self,
        path: &Path,
        source_path: &str,
        file_name: &str,
    ) -> Result<Vec<Segment>, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::io(path, source))?;
        let text = String::from_utf8(bytes).map_err(|_| ExtractionError::Encoding {
            path: path.display().to_string(),
        })?;

        let segments: Vec<Segment> = chunk_page(&text, &self.options)
            .into_iter()
            .map(|chunk| Segment {
                source_path: source_path.to_string(),
                file_name: file_name.to_string(),
                page_number: None,
                text: chunk,
            })
            .collect();

        tracing::debug!(file = file_name, segments = segments.len(), "Text extracted");
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn extracts_single_paragraph() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Tokio schedules async tasks on worker threads.\n").expect("write");

        let extractor = TextExtractor::new(ChunkingOptions::default());
        let segments = extractor
            .extract(&path, "uploads/notes.txt", "notes.txt")
            .await
            .expect("segments");

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].file_name, "notes.txt");
        assert_eq!(segments[0].source_path, "uploads/notes.txt");
        assert_eq!(segments[0].page_number, None);
        assert_eq!(
            segments[0].text,
            "Tokio schedules async tasks on worker threads."
        );
    }

    #[tokio::test]
    async fn rejects_invalid_utf8() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).expect("write");

        let extractor = TextExtractor::new(ChunkingOptions::default());
        let error = extractor
            .extract(&path, "binary.txt", "binary.txt")
            .await
            .expect_err("encoding error");
        assert!(matches!(error, ExtractionError::Encoding { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let extractor = TextExtractor::new(ChunkingOptions::default());
        let error = extractor
            .extract(Path::new("/definitely/missing.txt"), "missing.txt", "missing.txt")
            .await
            .expect_err("io error");
        assert!(matches!(error, ExtractionError::Io { .. }));
    }
}

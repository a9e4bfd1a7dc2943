//! PDF adapter.
//!
//! Text is pulled page by page with `lopdf` on a blocking thread; each page is chunked on its own
//! so every segment carries the page it came from. A page whose text cannot be decoded fails the
//! whole file.

use super::chunking::{ChunkingOptions, chunk_page};
use super::{ExtractionError, Segment};
use lopdf::Document;
use std::fmt::Display;
use std::path::Path;
use tracing::debug;

/// Extracts per-page text from PDF files.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    options: ChunkingOptions,
}

impl PdfExtractor {
    /// Create an adapter using the given chunk budgets.
    pub fn new(options: ChunkingOptions) -> Self {
        Self { options }
    }

    /// Read and chunk the PDF at `path`.
    pub async fn extract(
        &self,
        path: &Path,
        source_path: &str,
        file_name: &str,
    ) -> Result<Vec<Segment>, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::io(path, source))?;

        let pages = tokio::task::spawn_blocking(move || extract_pdf_pages(&bytes))
            .await
            .map_err(|error| ExtractionError::Task(error.to_string()))?
            .map_err(|message| ExtractionError::Pdf {
                path: path.display().to_string(),
                message,
            })?;

        let segments = segments_from_pages(source_path, file_name, pages, &self.options);
        debug!(file = file_name, segments = segments.len(), "PDF extracted");
        Ok(segments)
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<(u32, String)>, String> {
    let document = Document::load_mem(bytes).map_err(|error| error.to_string())?;
    collect_page_texts(
        document
            .get_pages()
            .keys()
            .map(|&page_number| (page_number, document.extract_text(&[page_number]))),
    )
}

fn collect_page_texts<E: Display>(
    pages: impl IntoIterator<Item = (u32, Result<String, E>)>,
) -> Result<Vec<(u32, String)>, String> {
    pages
        .into_iter()
        .map(|(page_number, text)| {
            text.map(|text| (page_number, text))
                .map_err(|error| format!("page {page_number}: {error}"))
        })
        .collect()
}

/// Chunk each page independently and tag segments with their page number.
pub(crate) fn segments_from_pages(
    source_path: &str,
    file_name: &str,
    pages: Vec<(u32, String)>,
    options: &ChunkingOptions,
) -> Vec<Segment> {
    pages
        .into_iter()
        .flat_map(|(page_number, text)| {
            chunk_page(&text, options)
                .into_iter()
                .map(move |chunk| Segment {
                    source_path: source_path.to_string(),
                    file_name: file_name.to_string(),
                    page_number: Some(page_number),
                    text: chunk,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Minimal PDF with one line of Courier text per page.
    fn two_page_pdf(lines: [&str; 2]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode")));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize pdf");
        bytes
    }

    #[tokio::test]
    async fn extracts_text_per_page_from_real_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, two_page_pdf(["Quarterly revenue grew", "Appendix tables follow"]))
            .expect("write pdf");

        let segments = PdfExtractor::new(ChunkingOptions::default())
            .extract(&path, "uploads/report.pdf", "report.pdf")
            .await
            .expect("extract");

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page_number, Some(1));
        assert!(segments[0].text.contains("Quarterly revenue grew"));
        assert_eq!(segments[1].page_number, Some(2));
        assert!(segments[1].text.contains("Appendix tables follow"));
        assert!(segments.iter().all(|segment| segment.source_path == "uploads/report.pdf"));
    }

    #[test]
    fn unreadable_page_fails_the_document() {
        let pages = vec![
            (1, Ok("Cover page text.".to_string())),
            (2, Err("invalid content stream")),
            (3, Ok("Appendix body.".to_string())),
        ];
        let error = collect_page_texts(pages).expect_err("page 2 is unreadable");
        assert_eq!(error, "page 2: invalid content stream");
    }

    #[test]
    fn pages_keep_their_numbers_and_skip_blank_pages() {
        let pages = vec![
            (1, "Cover page text.".to_string()),
            (2, "   ".to_string()),
            (3, "Appendix body.".to_string()),
        ];
        let segments =
            segments_from_pages("uploads/r.pdf", "r.pdf", pages, &ChunkingOptions::default());

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page_number, Some(1));
        assert_eq!(segments[1].page_number, Some(3));
        assert_eq!(segments[1].text, "Appendix body.");
        assert!(segments.iter().all(|segment| segment.file_name == "r.pdf"));
    }

    #[test]
    fn chunks_never_span_pages() {
        let options = ChunkingOptions {
            combine_under_characters: 10_000,
            ..ChunkingOptions::default()
        };
        let pages = vec![(1, "One.".to_string()), (2, "Two.".to_string())];
        let segments = segments_from_pages("a.pdf", "a.pdf", pages, &options);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(extract_pdf_pages(b"not a pdf").is_err());
    }
}

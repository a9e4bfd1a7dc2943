//! Per-segment summarization with bounded concurrency.

use crate::chat::{ChatClient, ChatRequest};
use crate::extract::{Segment, SourceKind};
use crate::processing::types::ProcessingError;
use futures_util::{StreamExt, TryStreamExt, stream};

const DOCUMENT_TEMPLATE: &str = "You are an assistant tasked with summarizing tables and text. \
Give a concise summary of the table or text below. Reply with the summary only.\n\n\
Table or text chunk:\n";

const IMAGE_TEMPLATE: &str = "You are an assistant tasked with summarizing text that was read \
from an image. Give a very brief summary of it. If the text contains questions, do not answer \
them; mention that they are asked. Reply with the summary only.\n\n\
Image text:\n";

/// Render the summarization prompt for one segment of the given kind.
pub fn summary_prompt(kind: SourceKind, text: &str) -> String {
    let template = match kind {
        SourceKind::Text | SourceKind::Pdf => DOCUMENT_TEMPLATE,
        SourceKind::Image => IMAGE_TEMPLATE,
    };
    format!("{template}{text}")
}

/// Summarize every segment, keeping at most `concurrency` model calls in flight.
///
/// Output order matches `segments`. The first failed call aborts the batch and drops the calls
/// still in flight.
pub async fn summarize_segments(
    chat: &dyn ChatClient,
    model: &str,
    kind: SourceKind,
    segments: &[Segment],
    concurrency: usize,
) -> Result<Vec<String>, ProcessingError> {
    if segments.is_empty() {
        return Ok(Vec::new());
    }

    // Built eagerly: a lazy iterator borrowing `segments` would make the caller's future
    // non-`Send` once it is held across the await below.
    let requests: Vec<ChatRequest> = segments
        .iter()
        .map(|segment| ChatRequest {
            model: model.to_string(),
            prompt: summary_prompt(kind, &segment.text),
            temperature: Some(0.0),
        })
        .collect();

    let summaries: Vec<String> = stream::iter(requests)
        .map(|request| chat.complete(request))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
        .map_err(ProcessingError::Summarization)?;

    tracing::debug!(
        kind = %kind,
        segments = segments.len(),
        concurrency,
        "Segments summarized"
    );
    Ok(summaries)
}

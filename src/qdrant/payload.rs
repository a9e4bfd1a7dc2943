//! Helpers for constructing and reading summary payloads.

use crate::extract::SourceKind;
use crate::store::SummaryRecord;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Build the payload object stored alongside each summary vector.
pub(crate) fn build_payload(record: &SummaryRecord, indexed_at_rfc3339: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("doc_id".into(), Value::String(record.doc_id.clone()));
    payload.insert("chunk_id".into(), Value::String(record.chunk_id.clone()));
    payload.insert("summary".into(), Value::String(record.summary.clone()));
    payload.insert("file_name".into(), Value::String(record.file_name.clone()));
    payload.insert(
        "page_number".into(),
        record.page_number.map_or(Value::Null, Value::from),
    );
    payload.insert("kind".into(), Value::String(record.kind.as_str().to_string()));
    payload.insert(
        "content_hash".into(),
        Value::String(compute_content_hash(&record.summary)),
    );
    payload.insert(
        "indexed_at".into(),
        Value::String(indexed_at_rfc3339.to_string()),
    );
    Value::Object(payload)
}

/// Rebuild a [`SummaryRecord`] from a stored payload.
///
/// Returns `None` when a required field is missing, which only happens for points written by
/// something other than this crate.
pub(crate) fn record_from_payload(payload: &Map<String, Value>) -> Option<SummaryRecord> {
    let text = |key: &str| payload.get(key)?.as_str().map(str::to_string);
    let kind = match payload.get("kind")?.as_str()? {
        "pdf" => SourceKind::Pdf,
        "text" => SourceKind::Text,
        "image" => SourceKind::Image,
        _ => return None,
    };
    let page_number = payload
        .get("page_number")
        .and_then(Value::as_u64)
        .and_then(|page| u32::try_from(page).ok());

    Some(SummaryRecord {
        doc_id: text("doc_id")?,
        chunk_id: text("chunk_id")?,
        summary: text("summary")?,
        file_name: text("file_name")?,
        page_number,
        kind,
    })
}

/// Compute a deterministic SHA-256 hash of the summary text.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

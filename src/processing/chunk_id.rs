//! Deterministic identifiers for extracted segments.
//!
//! A chunk id is positional: `{source_path}:{page}:{ordinal}`, with page `0` for unpaged sources
//! and an ordinal that restarts whenever the `(source_path, page)` pair changes. The point id
//! used by both stores is a name-based UUID of the chunk id, so the same file chunked the same
//! way always maps onto the same entries.

use crate::extract::Segment;
use uuid::Uuid;

const CHUNK_NAMESPACE: Uuid = Uuid::from_u128(0x6c3f_9b2e_51a4_4d8e_9f07_2a1d_c4e8_b350);

/// Assign positional chunk ids to segments in extraction order.
pub fn assign_chunk_ids(segments: &[Segment]) -> Vec<String> {
    let mut ids = Vec::with_capacity(segments.len());
    let mut previous: Option<(&str, u32)> = None;
    let mut ordinal = 0usize;

    for segment in segments {
        let page = segment.page_number.unwrap_or(0);
        let key = (segment.source_path.as_str(), page);
        if previous == Some(key) {
            ordinal += 1;
        } else {
            ordinal = 0;
            previous = Some(key);
        }
        ids.push(format!("{}:{page}:{ordinal}", segment.source_path));
    }
    ids
}

/// Point id shared by the vector index entry and the document store entry of a chunk.
pub fn point_id(chunk_id: &str) -> Uuid {
    Uuid::new_v5(&CHUNK_NAMESPACE, chunk_id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(source: &str, page: Option<u32>) -> Segment {
        Segment {
            source_path: source.into(),
            file_name: source.into(),
            page_number: page,
            text: "text".into(),
        }
    }

    #[test]
    fn ordinals_restart_per_page() {
        let segments = vec![
            segment("r.pdf", Some(1)),
            segment("r.pdf", Some(1)),
            segment("r.pdf", Some(2)),
            segment("r.pdf", Some(2)),
            segment("r.pdf", Some(2)),
        ];
        assert_eq!(
            assign_chunk_ids(&segments),
            vec!["r.pdf:1:0", "r.pdf:1:1", "r.pdf:2:0", "r.pdf:2:1", "r.pdf:2:2"]
        );
    }

    #[test]
    fn unpaged_sources_use_page_zero() {
        let segments = vec![segment("notes.txt", None), segment("notes.txt", None)];
        assert_eq!(
            assign_chunk_ids(&segments),
            vec!["notes.txt:0:0", "notes.txt:0:1"]
        );
    }

    #[test]
    fn point_ids_are_stable_and_distinct() {
        assert_eq!(point_id("notes.txt:0:0"), point_id("notes.txt:0:0"));
        assert_ne!(point_id("notes.txt:0:0"), point_id("notes.txt:0:1"));
        assert_eq!(point_id("notes.txt:0:0").get_version_num(), 5);
    }
}

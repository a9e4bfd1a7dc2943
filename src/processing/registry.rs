//! Per-file record of the identifiers written to both stores.

use crate::extract::SourceKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// What was indexed for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Base name of the file; also the registry key.
    pub file_name: String,
    /// Extraction type used at ingestion; deletion relies on it.
    pub kind: SourceKind,
    /// Point ids present in the vector index and the document store.
    pub segment_ids: Vec<String>,
}

/// File name to [`FileRecord`] map.
#[derive(Debug, Default)]
pub struct FileRegistry {
    records: BTreeMap<String, FileRecord>,
}

impl FileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record identifiers for a file, merging with any previous record.
    ///
    /// Existing identifiers keep their position; new ones are appended.
    pub fn record(&mut self, file_name: &str, kind: SourceKind, segment_ids: Vec<String>) {
        let entry = self
            .records
            .entry(file_name.to_string())
            .or_insert_with(|| FileRecord {
                file_name: file_name.to_string(),
                kind,
                segment_ids: Vec::new(),
            });
        entry.kind = kind;
        for id in segment_ids {
            if !entry.segment_ids.contains(&id) {
                entry.segment_ids.push(id);
            }
        }
    }

    /// Look up a file.
    pub fn get(&self, file_name: &str) -> Option<&FileRecord> {
        self.records.get(file_name)
    }

    /// Evict a file, returning its record.
    pub fn remove(&mut self, file_name: &str) -> Option<FileRecord> {
        self.records.remove(file_name)
    }

    /// Evict every file.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no file is registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of every record keyed by file name.
    pub fn snapshot(&self) -> BTreeMap<String, FileRecord> {
        self.records.clone()
    }
}

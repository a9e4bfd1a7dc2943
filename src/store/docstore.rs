//! Process-local document store.

use super::{DocumentStore, StoreError};
use crate::extract::Segment;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory [`DocumentStore`]; contents do not survive a restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    entries: RwLock<HashMap<String, Segment>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put_many(&self, entries: Vec<(String, Segment)>) -> Result<(), StoreError> {
        let mut guard = self.entries.write().await;
        guard.extend(entries);
        Ok(())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Option<Segment>>, StoreError> {
        let guard = self.entries.read().await;
        Ok(ids.iter().map(|id| guard.get(id).cloned()).collect())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut guard = self.entries.write().await;
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Segment {
        Segment {
            source_path: "uploads/a.txt".into(),
            file_name: "a.txt".into(),
            page_number: None,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn get_many_preserves_order_and_reports_missing() {
        let store = MemoryDocumentStore::new();
        store
            .put_many(vec![("1".into(), segment("one")), ("2".into(), segment("two"))])
            .await
            .expect("put");

        let found = store
            .get_many(&["2".into(), "missing".into(), "1".into()])
            .await
            .expect("get");
        assert_eq!(found[0].as_ref().map(|s| s.text.as_str()), Some("two"));
        assert!(found[1].is_none());
        assert_eq!(found[2].as_ref().map(|s| s.text.as_str()), Some("one"));
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = MemoryDocumentStore::new();
        store
            .put_many(vec![("1".into(), segment("one")), ("2".into(), segment("two"))])
            .await
            .expect("put");
        store.delete_many(&["1".into()]).await.expect("delete");
        assert_eq!(store.len().await.expect("len"), 1);
        store.clear().await.expect("clear");
        assert_eq!(store.len().await.expect("len"), 0);
    }
}

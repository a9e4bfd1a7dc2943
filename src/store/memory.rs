//! Process-local vector index with brute-force cosine search.

use super::{StoreError, SummaryPoint, VectorHit, VectorIndex};
use crate::retrieval::cosine_similarity;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// In-memory [`VectorIndex`] for single-process deployments and tests.
#[derive(Default)]
pub struct MemoryVectorIndex {
    points: RwLock<HashMap<String, SummaryPoint>>,
}

impl MemoryVectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<SummaryPoint>) -> Result<usize, StoreError> {
        let written = points.len();
        let mut guard = self.points.write().await;
        for point in points {
            guard.insert(point.id.clone(), point);
        }
        Ok(written)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        let guard = self.points.read().await;
        Ok(ids
            .iter()
            .filter(|id| guard.contains_key(id.as_str()))
            .cloned()
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut guard = self.points.write().await;
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>, StoreError> {
        let guard = self.points.read().await;
        let mut hits: Vec<VectorHit> = guard
            .values()
            .map(|point| VectorHit {
                id: point.id.clone(),
                score: cosine_similarity(vector, &point.vector),
                record: point.record.clone(),
                vector: point.vector.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.points.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.points.read().await.len())
    }
}

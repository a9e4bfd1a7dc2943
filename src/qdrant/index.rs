//! [`VectorIndex`] implementation backed by a Qdrant collection.

use super::client::QdrantService;
use super::payload::record_from_payload;
use crate::store::{StoreError, SummaryPoint, VectorHit, VectorIndex};
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
impl VectorIndex for QdrantService {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.create_collection_if_not_exists().await?;
        self.ensure_payload_indexes().await?;
        Ok(())
    }

    async fn upsert(&self, points: Vec<SummaryPoint>) -> Result<usize, StoreError> {
        Ok(self.upsert_points(points).await?)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        Ok(self.retrieve_ids(ids).await?)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        Ok(self.delete_points(ids).await?)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>, StoreError> {
        let points = self.query_points(vector, limit).await?;
        let hits = points
            .into_iter()
            .filter_map(|point| {
                let record = point.payload.as_ref().and_then(record_from_payload);
                match (record, point.vector) {
                    (Some(record), Some(vector)) => Some(VectorHit {
                        id: point.id,
                        score: point.score,
                        record,
                        vector,
                    }),
                    _ => {
                        tracing::warn!(id = %point.id, "Skipping search hit without summary payload or vector");
                        None
                    }
                }
            })
            .collect();
        Ok(hits)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.delete_collection().await?;
        self.create_collection().await?;
        self.ensure_payload_indexes().await?;
        tracing::info!(collection = %self.collection(), "Vector index reset");
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.count_points().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{DELETE, POST, PUT},
        MockServer,
    };
    use reqwest::Client;
    use serde_json::json;

    fn service(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::new(),
            base_url: server.base_url(),
            api_key: None,
            collection: "storage_vector".into(),
            vector_size: 2,
        }
    }

    #[tokio::test]
    async fn search_maps_payloads_and_drops_foreign_points() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/storage_vector/points/query");
                then.status(200).json_body(json!({
                    "result": { "points": [
                        {
                            "id": "a",
                            "score": 0.9,
                            "vector": [1.0, 0.0],
                            "payload": {
                                "doc_id": "a",
                                "chunk_id": "uploads/r.pdf:3:1",
                                "summary": "Revenue table.",
                                "file_name": "r.pdf",
                                "page_number": 3,
                                "kind": "pdf"
                            }
                        },
                        { "id": "b", "score": 0.5, "vector": [0.0, 1.0], "payload": { "text": "x" } }
                    ]}
                }));
            })
            .await;

        let hits = service(&server).search(&[1.0, 0.0], 15).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.page_number, Some(3));
        assert_eq!(hits[0].record.chunk_id, "uploads/r.pdf:3:1");
        assert_eq!(hits[0].vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn reset_drops_and_recreates_collection() {
        let server = MockServer::start_async().await;
        let dropped = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/collections/storage_vector");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let created = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/storage_vector");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let indexes = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/storage_vector/index");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        service(&server).reset().await.expect("reset");
        dropped.assert_async().await;
        created.assert_async().await;
        indexes.assert_hits_async(2).await;
    }
}

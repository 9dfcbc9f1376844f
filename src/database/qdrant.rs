use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
        point_id::PointIdOptions,
    },
    Payload as QdrantPayload,
    Qdrant,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::qdrant_config::create_qdrant_client;
use super::vector_db::{Payload, ScoredPoint, VectorDBError, VectorStore};

#[derive(Clone)]
pub struct QdrantVectorDB {
    client: Arc<Qdrant>,
}

impl QdrantVectorDB {
    pub async fn new(url: &str) -> Result<Self, VectorDBError> {
        let client = create_qdrant_client(url).await?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

fn operation(e: impl std::fmt::Display) -> VectorDBError {
    VectorDBError::Operation(e.to_string())
}

#[async_trait]
impl VectorStore for QdrantVectorDB {
    async fn create_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDBError> {
        if self.client.collection_exists(name).await.map_err(operation)? {
            info!("Collection {} already exists, skipping creation", name);
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(operation)?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorDBError> {
        if self.client.collection_exists(name).await.map_err(operation)? {
            self.client.delete_collection(name).await.map_err(operation)?;
        }
        Ok(())
    }

    async fn store_vectors(
        &self,
        collection: &str,
        points: Vec<(Vec<f32>, Payload)>,
    ) -> Result<Vec<String>, VectorDBError> {
        let mut ids = Vec::with_capacity(points.len());
        let mut structs = Vec::with_capacity(points.len());

        for (vector, payload) in points {
            let point_id = Uuid::new_v4().to_string();
            let payload = QdrantPayload::try_from(serde_json::Value::Object(payload.into_iter().collect()))
                .map_err(operation)?;
            structs.push(PointStruct::new(point_id.clone(), vector, payload));
            ids.push(point_id);
        }

        if structs.is_empty() {
            return Ok(ids);
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(operation)?;

        Ok(ids)
    }

    async fn search_vectors(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorDBError> {
        let results = self
            .client
            .search_points(SearchPointsBuilder::new(collection, query_vector, limit).with_payload(true))
            .await
            .map_err(operation)?;

        let points = results
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(PointIdOptions::Uuid(uuid)) => uuid,
                    Some(PointIdOptions::Num(num)) => num.to_string(),
                    None => String::new(),
                };
                let payload = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect();
                (id, point.score, payload)
            })
            .collect();

        Ok(points)
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorDBError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(operation)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

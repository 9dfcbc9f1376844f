use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::providers::utils::cosine_similarity;

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Payload = HashMap<String, serde_json::Value>;

/// One search hit: point id, similarity score and stored payload.
pub type ScoredPoint = (String, f32, Payload);

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection; an existing collection is left as is.
    async fn create_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDBError>;

    /// Drops the collection if it exists.
    async fn delete_collection(&self, name: &str) -> Result<(), VectorDBError>;

    async fn store_vectors(
        &self,
        collection: &str,
        points: Vec<(Vec<f32>, Payload)>,
    ) -> Result<Vec<String>, VectorDBError>;

    /// Top `limit` points by descending similarity.
    async fn search_vectors(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorDBError>;

    async fn count(&self, collection: &str) -> Result<usize, VectorDBError>;
}

struct Collection {
    vector_size: usize,
    points: Vec<(String, Vec<f32>, Payload)>,
}

/// Process-local store with brute-force cosine search.
#[derive(Clone, Default)]
pub struct InMemoryVectorDB {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryVectorDB {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorDB {
    async fn create_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDBError> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            info!("Collection {} already exists, skipping creation", name);
            return Ok(());
        }
        collections.insert(
            name.to_string(),
            Collection {
                vector_size: vector_size as usize,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorDBError> {
        self.collections.write().remove(name);
        Ok(())
    }

    async fn store_vectors(
        &self,
        collection: &str,
        points: Vec<(Vec<f32>, Payload)>,
    ) -> Result<Vec<String>, VectorDBError> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| VectorDBError::CollectionNotFound(collection.to_string()))?;

        // Validate everything before inserting anything
        if let Some((vector, _)) = points.iter().find(|(v, _)| v.len() != target.vector_size) {
            return Err(VectorDBError::DimensionMismatch {
                expected: target.vector_size,
                actual: vector.len(),
            });
        }

        let mut ids = Vec::with_capacity(points.len());
        for (vector, payload) in points {
            let point_id = Uuid::new_v4().to_string();
            ids.push(point_id.clone());
            target.points.push((point_id, vector, payload));
        }
        Ok(ids)
    }

    async fn search_vectors(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorDBError> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| VectorDBError::CollectionNotFound(collection.to_string()))?;

        if query_vector.len() != target.vector_size {
            return Err(VectorDBError::DimensionMismatch {
                expected: target.vector_size,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<ScoredPoint> = target
            .points
            .iter()
            .map(|(id, vector, payload)| {
                (id.clone(), cosine_similarity(&query_vector, vector), payload.clone())
            })
            .collect();

        // stable sort keeps insertion order on ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit as usize);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorDBError> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.points.len())
            .ok_or_else(|| VectorDBError::CollectionNotFound(collection.to_string()))
    }
}

use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::vector_db::{Payload, VectorDBError, VectorStore};
use crate::document::DocumentChunk;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    pub score: f32,
    pub source: String,
    pub page: u32,
    pub chunk_index: usize,
}

/// Chunk index for one collection in a vector store.
pub struct SemanticSearch {
    store: Arc<dyn VectorStore>,
    collection_name: String,
}

impl SemanticSearch {
    pub fn new(store: Arc<dyn VectorStore>, collection_name: impl Into<String>) -> Self {
        Self {
            store,
            collection_name: collection_name.into(),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Drops whatever was indexed before.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .delete_collection(&self.collection_name)
            .await
            .map_err(|e| Error::msg(format!("Failed to clear index: {}", e)))
    }

    /// Replaces the collection's contents with `chunks`.
    pub async fn index_chunks(&self, chunks: &[DocumentChunk], embeddings: Vec<Vec<f32>>) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(Error::msg(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        self.clear().await?;
        let Some(dimension) = embeddings.first().map(|e| e.len()) else {
            return Ok(0);
        };

        self.store
            .create_collection(&self.collection_name, dimension as u64)
            .await
            .map_err(|e| Error::msg(format!("Failed to create collection: {}", e)))?;

        let points: Vec<(Vec<f32>, Payload)> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let mut payload = HashMap::new();
                payload.insert("text".to_string(), serde_json::Value::String(chunk.text.clone()));
                payload.insert("source".to_string(), serde_json::Value::String(chunk.source.clone()));
                payload.insert("page".to_string(), serde_json::json!(chunk.page));
                payload.insert("chunk".to_string(), serde_json::json!(chunk.chunk_index));
                (embedding, payload)
            })
            .collect();

        let ids = self.store
            .store_vectors(&self.collection_name, points)
            .await
            .map_err(|e| Error::msg(format!("Failed to index chunks: {}", e)))?;

        Ok(ids.len())
    }

    pub async fn search(&self, query_embedding: Vec<f32>, limit: u64) -> Result<Vec<SearchResult>> {
        let results = match self.store.search_vectors(&self.collection_name, query_embedding, limit).await {
            Ok(results) => results,
            // nothing indexed yet
            Err(VectorDBError::CollectionNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(Error::msg(format!("Failed to search: {}", e))),
        };

        let search_results = results.into_iter()
            .filter_map(|(_, score, payload)| {
                let text = payload.get("text")?.as_str()?.to_string();
                let source = payload.get("source")?.as_str()?.to_string();
                let page = payload.get("page").and_then(|p| p.as_u64()).unwrap_or(0) as u32;
                let chunk_index = payload.get("chunk").and_then(|c| c.as_u64()).unwrap_or(0) as usize;

                Some(SearchResult {
                    text,
                    score,
                    source,
                    page,
                    chunk_index,
                })
            })
            .collect();

        Ok(search_results)
    }
}

use anyhow::{Error, Result};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::providers::traits::CompletionProvider;

const BATCH_SIZE: usize = 20;
const CACHE_CAPACITY: usize = 256;

pub struct EmbeddingGenerator {
    provider: Arc<dyn CompletionProvider + Send + Sync>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider + Send + Sync>) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Embeds a single text, reusing earlier results for repeated questions.
    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().get(text).cloned() {
            debug!("Embedding cache hit");
            return Ok(cached);
        }

        let embedding = self.provider.generate_embedding(text).await?;
        if embedding.is_empty() {
            return Err(Error::msg("Provider returned an empty embedding"));
        }
        self.cache.lock().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    pub async fn generate_batch_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let batch_embeddings = self.provider.generate_embeddings(batch).await?;
            if batch_embeddings.len() != batch.len() {
                return Err(Error::msg(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    batch_embeddings.len()
                )));
            }
            embeddings.extend(batch_embeddings);
        }

        // All vectors in one index must share a dimension
        if let Some(first) = embeddings.first() {
            let dim = first.len();
            if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
                return Err(Error::msg("Provider returned embeddings of inconsistent size"));
            }
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingProvider {
        single_calls: Arc<AtomicUsize>,
        batch_calls: Arc<AtomicUsize>,
        api_key: String,
    }

    #[async_trait]
    impl CompletionProvider for CountingProvider {
        async fn new(api_key: String, _system_message: String) -> Result<Self> {
            Ok(Self { api_key, ..Default::default() })
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        async fn get_model_info(&self) -> Result<String> {
            Ok("counting".to_string())
        }

        fn get_system_message(&self) -> String {
            String::new()
        }

        fn get_api_key(&self) -> &String {
            &self.api_key
        }

        fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let provider = CountingProvider::default();
        let generator = EmbeddingGenerator::new(Arc::new(provider.clone()));

        let first = generator.generate_embedding("what is rust?").await.unwrap();
        let second = generator.generate_embedding("what is rust?").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.single_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batches_in_groups_of_twenty() {
        let provider = CountingProvider::default();
        let generator = EmbeddingGenerator::new(Arc::new(provider.clone()));

        let texts: Vec<String> = (0..45).map(|i| format!("chunk {}", i)).collect();
        let embeddings = generator.generate_batch_embeddings(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 45);
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(embeddings[44], vec!["chunk 44".len() as f32, 1.0]);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let provider = CountingProvider::default();
        let generator = EmbeddingGenerator::new(Arc::new(provider.clone()));
        assert!(generator.generate_batch_embeddings(&[]).await.unwrap().is_empty());
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 0);
    }
}

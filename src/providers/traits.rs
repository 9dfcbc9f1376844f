use async_trait::async_trait;
use std::any::Any;
use anyhow::Result;

#[async_trait]
pub trait CompletionProvider: Any + Send + Sync {
    async fn new(api_key: String, system_message: String) -> Result<Self>
    where
        Self: Sized;

    async fn complete(&self, prompt: &str) -> Result<String>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds several texts, preserving input order.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.generate_embedding(text).await?);
        }
        Ok(embeddings)
    }

    async fn get_model_info(&self) -> Result<String>;

    fn get_system_message(&self) -> String;

    fn get_api_key(&self) -> &String;

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync>;
}

impl Clone for Box<dyn CompletionProvider + Send + Sync> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Builds a provider for a session once its API key and model are known.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, api_key: &str, model: &str) -> Result<Box<dyn CompletionProvider + Send + Sync>>;

    fn available_models(&self) -> Vec<String>;
}

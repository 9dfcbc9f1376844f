use anyhow::{anyhow, Result};
use async_trait::async_trait;
use crate::config::ProviderConfig;
use crate::providers::gemini::gemini::GeminiProvider;
use crate::providers::traits::{CompletionProvider, ProviderFactory};

/// Instruction prepended to every generation request.
pub const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about the user's PDF documents. \
Answer using only the provided context. If the context does not contain the answer, say that you don't know. \
Cite sources by their bracketed number when you use them.";

#[derive(Clone)]
pub struct GeminiFactory {
    config: ProviderConfig,
}

impl GeminiFactory {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderConfig::from_env("gemini"))
    }
}

#[async_trait]
impl ProviderFactory for GeminiFactory {
    async fn create(&self, api_key: &str, model: &str) -> Result<Box<dyn CompletionProvider + Send + Sync>> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("Gemini API key is missing"));
        }

        let provider = GeminiProvider::with_config(
            api_key.trim().to_string(),
            RAG_SYSTEM_PROMPT.to_string(),
            model.to_string(),
            &self.config,
        )?;
        Ok(Box::new(provider))
    }

    fn available_models(&self) -> Vec<String> {
        self.config.models.clone()
    }
}

//! Offline stand-ins for the Gemini provider and the PDF loader.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::document::{DocumentError, DocumentLoader, DocumentPage};
use crate::providers::traits::{CompletionProvider, ProviderFactory};

const DIM: usize = 64;

/// Bag-of-words embeddings, so questions land near chunks sharing words.
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
        vector[(hash % DIM as u64) as usize] += 1.0;
    }
    vector
}

#[derive(Clone, Default)]
pub struct KeywordProvider {
    api_key: String,
    pub completions: Arc<AtomicUsize>,
}

#[async_trait]
impl CompletionProvider for KeywordProvider {
    async fn new(api_key: String, _system_message: String) -> Result<Self> {
        Ok(Self { api_key, ..Default::default() })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("explode") {
            return Err(anyhow!("model unavailable"));
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        let blocks = prompt.matches("(Page ").count();
        Ok(format!("Answer drawn from {} passages.", blocks))
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_embedding(text))
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("keyword".to_string())
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

#[derive(Clone, Default)]
pub struct KeywordFactory {
    pub provider: KeywordProvider,
}

#[async_trait]
impl ProviderFactory for KeywordFactory {
    async fn create(&self, api_key: &str, _model: &str) -> Result<Box<dyn CompletionProvider + Send + Sync>> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("Gemini API key is missing"));
        }
        Ok(Box::new(self.provider.clone()))
    }

    fn available_models(&self) -> Vec<String> {
        vec!["gemini-pro".to_string(), "gemini-pro-vision".to_string()]
    }
}

/// Treats the uploaded bytes as UTF-8 text with form feeds between pages.
#[derive(Clone, Default)]
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, DocumentError> {
        let source = crate::document::file_name_of(path);
        let bytes = tokio::fs::read(path).await.map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| DocumentError::Extraction(source.clone(), e.to_string()))?;
        if text.starts_with("CORRUPT") {
            return Err(DocumentError::Extraction(source, "corrupt file".to_string()));
        }

        Ok(text
            .split('\u{c}')
            .enumerate()
            .filter(|(_, page)| !page.trim().is_empty())
            .map(|(i, page)| DocumentPage {
                source: source.clone(),
                page: i as u32 + 1,
                text: page.to_string(),
            })
            .collect())
    }
}

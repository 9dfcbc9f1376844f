use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    system_message: Arc<RwLock<String>>,
    client: Client,
    model: String,
    embedding_model: String,
    api_url: String,
    temperature: f32,
}

impl GeminiProvider {
    pub fn with_config(
        api_key: String,
        system_message: String,
        model: String,
        config: &ProviderConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            api_key,
            system_message: Arc::new(RwLock::new(system_message)),
            client,
            model,
            embedding_model: config.embedding_model.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_url, model, method)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self.client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Gemini request failed: Status {}, Body: {}", status, error_text));
        }

        let response_json: Value = response.json().await?;

        // Check for API-level errors
        if let Some(error) = response_json.get("error") {
            return Err(anyhow!("Gemini returned error: {}", error));
        }

        Ok(response_json)
    }

    fn embed_request(&self, text: &str) -> Value {
        json!({
            "model": format!("models/{}", self.embedding_model),
            "content": {
                "parts": [{ "text": text }]
            }
        })
    }
}

fn parse_values(embedding: &Value) -> Result<Vec<f32>> {
    embedding
        .get("values")
        .and_then(|values| values.as_array())
        .ok_or_else(|| anyhow!("Embedding response is missing values"))?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32).ok_or_else(|| anyhow!("Non-numeric embedding value")))
        .collect()
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn new(api_key: String, system_message: String) -> Result<Self> {
        let config = ProviderConfig::from_env("gemini");
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| config.default_model());
        Self::with_config(api_key, system_message, model, &config)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let system_message = self.system_message.read().clone();

        let response_json = self
            .post(
                &self.endpoint(&self.model, "generateContent"),
                &json!({
                    "contents": [{
                        "role": "user",
                        "parts": [{
                            "text": format!("{}\n{}", system_message, prompt)
                        }]
                    }],
                    "generationConfig": {
                        "temperature": self.temperature
                    }
                }),
            )
            .await?;

        response_json
            .get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                let debug_json = serde_json::to_string_pretty(&response_json).unwrap_or_default();
                anyhow!("Invalid response format. Response JSON: {}", debug_json)
            })
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let response_json = self
            .post(
                &self.endpoint(&self.embedding_model, "embedContent"),
                &self.embed_request(text),
            )
            .await?;

        let embedding = response_json
            .get("embedding")
            .ok_or_else(|| anyhow!("Embedding response is missing 'embedding'"))?;
        parse_values(embedding)
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<Value> = texts.iter().map(|t| self.embed_request(t)).collect();
        let response_json = self
            .post(
                &self.endpoint(&self.embedding_model, "batchEmbedContents"),
                &json!({ "requests": requests }),
            )
            .await?;

        let embeddings = response_json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Batch embedding response is missing 'embeddings'"))?;

        if embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Batch embedding returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            ));
        }

        embeddings.iter().map(parse_values).collect()
    }

    fn get_system_message(&self) -> String {
        self.system_message.read().clone()
    }

    fn get_api_key(&self) -> &String {
        &self.api_key
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }
}

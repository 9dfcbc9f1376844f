use serde::{Deserialize, Serialize};
use std::env;
use validator::{Validate, ValidationError};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_K_RESULTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub models: Vec<String>,
    pub api_url: String,
    pub embedding_model: String,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase();

        // Get models from env or use defaults
        let models = env::var(format!("{}_MODELS", prefix))
            .map(|m| m.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_else(|_| match provider {
                "gemini" => vec![
                    "gemini-pro".to_string(),
                    "gemini-pro-vision".to_string(),
                ],
                _ => vec![]
            });

        // Base URL, the model path is appended per request
        let api_url = env::var(format!("{}_API_URL", prefix))
            .unwrap_or_else(|_| match provider {
                "gemini" => "https://generativelanguage.googleapis.com/v1beta".to_string(),
                _ => String::new()
            });

        let embedding_model = env::var(format!("{}_EMBEDDING_MODEL", prefix))
            .unwrap_or_else(|_| match provider {
                "gemini" => "text-embedding-004".to_string(),
                _ => String::new()
            });

        // Get temperature from env or use default
        let temperature = env::var(format!("{}_TEMPERATURE", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.7);

        Self {
            models,
            api_url,
            embedding_model,
            temperature,
        }
    }

    pub fn default_model(&self) -> String {
        self.models.first().cloned().unwrap_or_else(|| "gemini-pro".to_string())
    }
}

/// Per-session knobs: credentials, model choice, chunking and retrieval depth.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_overlap", skip_on_field_errors = false))]
pub struct RagSettings {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 500, max = 2000))]
    pub chunk_size: usize,
    #[validate(range(min = 0, max = 500))]
    pub chunk_overlap: usize,
    #[validate(range(min = 1, max = 10))]
    pub k_results: usize,
}

fn validate_overlap(settings: &RagSettings) -> Result<(), ValidationError> {
    if settings.chunk_overlap >= settings.chunk_size {
        return Err(ValidationError::new("chunk_overlap_not_below_chunk_size"));
    }
    Ok(())
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: ProviderConfig::from_env("gemini").default_model(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            k_results: DEFAULT_K_RESULTS,
        }
    }
}

impl RagSettings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Applies a partial update and validates the result before committing it.
    pub fn apply(&mut self, patch: SettingsPatch, allowed_models: &[String]) -> Result<(), String> {
        let mut next = self.clone();
        if let Some(api_key) = patch.api_key {
            next.api_key = api_key;
        }
        if let Some(model) = patch.model {
            next.model = model;
        }
        if let Some(chunk_size) = patch.chunk_size {
            next.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = patch.chunk_overlap {
            next.chunk_overlap = chunk_overlap;
        }
        if let Some(k_results) = patch.k_results {
            next.k_results = k_results;
        }

        next.validate().map_err(|e| format!("Invalid settings: {}", e))?;
        if !allowed_models.is_empty() && !allowed_models.contains(&next.model) {
            return Err(format!(
                "Invalid settings: unknown model '{}' (available: {})",
                next.model,
                allowed_models.join(", ")
            ));
        }

        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub k_results: Option<usize>,
}

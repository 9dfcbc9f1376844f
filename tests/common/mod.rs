//! Offline provider and loader used to drive the router without network or PDFs.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use pdf_rag_chat::api::{create_api, AppState};
use pdf_rag_chat::config::RagSettings;
use pdf_rag_chat::database::InMemoryVectorDB;
use pdf_rag_chat::document::{file_name_of, DocumentError, DocumentLoader, DocumentPage};
use pdf_rag_chat::providers::traits::{CompletionProvider, ProviderFactory};
use pdf_rag_chat::session::RagServices;

pub const BOUNDARY: &str = "pdf-rag-chat-boundary";

fn word_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; 32];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let slot = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
        vector[slot % 32] += 1.0;
    }
    vector
}

#[derive(Clone, Default)]
pub struct EchoProvider {
    api_key: String,
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn new(api_key: String, _system_message: String) -> Result<Self> {
        Ok(Self { api_key })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Question: fail") {
            return Err(anyhow!("quota exceeded"));
        }
        Ok(format!("Found {} relevant passages.", prompt.matches("(Page ").count()))
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        Ok(word_vector(text))
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("echo".to_string())
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

pub struct EchoFactory;

#[async_trait]
impl ProviderFactory for EchoFactory {
    async fn create(&self, api_key: &str, _model: &str) -> Result<Box<dyn CompletionProvider + Send + Sync>> {
        Ok(Box::new(EchoProvider::new(api_key.to_string(), String::new()).await?))
    }

    fn available_models(&self) -> Vec<String> {
        vec!["gemini-pro".to_string(), "gemini-pro-vision".to_string()]
    }
}

/// Reads uploads as plain text, one page per form feed.
pub struct PlainTextLoader;

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, DocumentError> {
        let source = file_name_of(path);
        let text = tokio::fs::read_to_string(path).await.map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        if text.starts_with("%BROKEN") {
            return Err(DocumentError::Extraction(source, "unreadable xref table".to_string()));
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

pub fn app() -> Router {
    let services = RagServices {
        factory: Arc::new(EchoFactory),
        store: Arc::new(InMemoryVectorDB::new()),
        loader: Arc::new(PlainTextLoader),
    };
    create_api(AppState::new(services, RagSettings::default()))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

pub fn upload_request(session: &str, files: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, content) in files {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n{}\r\n",
            BOUNDARY, name, content
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{}/files", session))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

/// Creates a session carrying an API key and returns its id.
pub async fn keyed_session(app: &Router) -> String {
    let (status, body) = send(app, json_request("POST", "/api/sessions", serde_json::json!({ "api_key": "test-key" }))).await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

mod export;
mod message;
mod store;

pub use export::ChatExport;
pub use message::{ChatMessage, Role, SourceRef};
pub use store::SessionStore;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{RagSettings, SettingsPatch};
use crate::database::vector_db::VectorStore;
use crate::document::{file_name_of, is_pdf, DocumentLoader};
use crate::llm::rag::RagSystem;
use crate::providers::traits::ProviderFactory;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),
    #[error("Please upload and process PDF files first.")]
    NoDocuments,
    #[error("Please enter your Gemini API key.")]
    MissingApiKey,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Only PDF files are supported: {0}")]
    UnsupportedFile(String),
    #[error("Error processing files: {0}")]
    Processing(String),
    #[error("Error: {0}")]
    Query(String),
    #[error("No chat history to export")]
    NothingToExport,
}

/// Shared backends every session builds its retrieval engine from.
#[derive(Clone)]
pub struct RagServices {
    pub factory: Arc<dyn ProviderFactory>,
    pub store: Arc<dyn VectorStore>,
    pub loader: Arc<dyn DocumentLoader>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub files: Vec<String>,
    pub total_chunks: usize,
}

impl ProcessOutcome {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} files with {} chunks!",
            self.files.len(),
            self.total_chunks
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub files_processed: usize,
    pub chat_messages: usize,
    pub model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub k_results: usize,
    pub has_api_key: bool,
    pub created_at: DateTime<Utc>,
}

pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    processed_files: Vec<String>,
    settings: RagSettings,
    rag_system: Option<Arc<RagSystem>>,
}

impl Session {
    pub fn new(settings: RagSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            messages: Vec::new(),
            processed_files: Vec::new(),
            settings,
            rag_system: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn processed_files(&self) -> &[String] {
        &self.processed_files
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn has_index(&self) -> bool {
        self.rag_system.is_some()
    }

    pub fn update_settings(&mut self, patch: SettingsPatch, allowed_models: &[String]) -> Result<(), SessionError> {
        self.settings
            .apply(patch, allowed_models)
            .map_err(SessionError::InvalidInput)
    }

    /// Writes the uploads to a scratch directory and indexes them with a
    /// fresh retrieval engine. The previous index survives a failed run.
    pub async fn process_files(
        &mut self,
        services: &RagServices,
        uploads: Vec<UploadedFile>,
    ) -> Result<ProcessOutcome, SessionError> {
        if uploads.is_empty() {
            return Err(SessionError::InvalidInput("No files uploaded".to_string()));
        }
        if !self.settings.has_api_key() {
            return Err(SessionError::MissingApiKey);
        }

        let mut names = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            let name = file_name_of(Path::new(&upload.name));
            if name.is_empty() || name == ".." {
                return Err(SessionError::InvalidInput(format!("Invalid file name: {}", upload.name)));
            }
            if !is_pdf(Path::new(&name)) {
                return Err(SessionError::UnsupportedFile(name));
            }
            names.push(name);
        }

        let temp_dir = tempfile::tempdir().map_err(|e| SessionError::Processing(e.to_string()))?;
        let mut pdf_paths: Vec<PathBuf> = Vec::with_capacity(uploads.len());
        for (name, upload) in names.iter().zip(&uploads) {
            let temp_path = temp_dir.path().join(name);
            tokio::fs::write(&temp_path, &upload.data)
                .await
                .map_err(|e| SessionError::Processing(e.to_string()))?;
            pdf_paths.push(temp_path);
        }

        let provider = services
            .factory
            .create(&self.settings.api_key, &self.settings.model)
            .await
            .map_err(|e| SessionError::Processing(e.to_string()))?;

        let collection = format!("session_{}_{}", self.id.simple(), Uuid::new_v4().simple());
        let rag_system = RagSystem::new(
            Arc::from(provider),
            services.store.clone(),
            services.loader.clone(),
            self.settings.chunk_size,
            self.settings.chunk_overlap,
            collection,
        );

        let result = rag_system.process_pdfs(&pdf_paths).await;

        // Cleanup
        if let Err(e) = temp_dir.close() {
            warn!(session = %self.id, "Failed to remove upload directory: {}", e);
        }

        let total_chunks = match result {
            Ok(total) => total,
            Err(e) => {
                if let Err(cleanup) = rag_system.discard().await {
                    warn!(session = %self.id, "Failed to drop partial index: {}", cleanup);
                }
                return Err(SessionError::Processing(e.to_string()));
            }
        };

        if let Some(previous) = self.rag_system.replace(Arc::new(rag_system)) {
            if let Err(e) = previous.discard().await {
                warn!(session = %self.id, "Failed to drop previous index: {}", e);
            }
        }
        self.processed_files = names;

        info!(session = %self.id, files = self.processed_files.len(), chunks = total_chunks, "Session files processed");

        Ok(ProcessOutcome {
            files: self.processed_files.clone(),
            total_chunks,
        })
    }

    /// Records the question, asks the retrieval engine and records the answer.
    /// A failed query leaves the question in the history.
    pub async fn ask(&mut self, prompt: &str) -> Result<ChatMessage, SessionError> {
        if self.processed_files.is_empty() {
            return Err(SessionError::NoDocuments);
        }
        if !self.settings.has_api_key() {
            return Err(SessionError::MissingApiKey);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::InvalidInput("Message must not be empty".to_string()));
        }
        let rag_system = self.rag_system.clone().ok_or(SessionError::NoDocuments)?;

        self.messages.push(ChatMessage::user(prompt));

        let response = rag_system
            .query(prompt, self.settings.k_results)
            .await
            .map_err(|e| SessionError::Query(e.to_string()))?;

        let reply = ChatMessage::assistant(response.answer, response.sources);
        self.messages.push(reply.clone());
        Ok(reply)
    }

    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            files_processed: self.processed_files.len(),
            chat_messages: self.messages.len(),
            model: self.settings.model.clone(),
            chunk_size: self.settings.chunk_size,
            chunk_overlap: self.settings.chunk_overlap,
            k_results: self.settings.k_results,
            has_api_key: self.settings.has_api_key(),
            created_at: self.created_at,
        }
    }

    pub fn export(&self, now: NaiveDateTime) -> Result<ChatExport, SessionError> {
        if self.messages.is_empty() {
            return Err(SessionError::NothingToExport);
        }
        Ok(ChatExport::new(self.processed_files.clone(), self.messages.clone(), now))
    }

    /// Releases the session's vector index.
    pub async fn close(&mut self) {
        if let Some(rag_system) = self.rag_system.take() {
            if let Err(e) = rag_system.discard().await {
                warn!(session = %self.id, "Failed to drop index: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryVectorDB;
    use crate::test_support::{KeywordFactory, TextLoader};
    use chrono::NaiveDate;
    use std::sync::atomic::Ordering;

    fn services() -> (RagServices, KeywordFactory, Arc<InMemoryVectorDB>) {
        let factory = KeywordFactory::default();
        let store = Arc::new(InMemoryVectorDB::new());
        let services = RagServices {
            factory: Arc::new(factory.clone()),
            store: store.clone(),
            loader: Arc::new(TextLoader),
        };
        (services, factory, store)
    }

    fn keyed_session() -> Session {
        Session::new(RagSettings {
            api_key: "key".to_string(),
            ..Default::default()
        })
    }

    fn upload(name: &str, text: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            data: text.as_bytes().to_vec(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap()
    }

    #[test]
    fn new_session_starts_empty() {
        let session = Session::new(RagSettings::default());
        assert!(session.messages().is_empty());
        assert!(session.processed_files().is_empty());
        assert!(!session.has_index());
        assert!(matches!(session.export(now()), Err(SessionError::NothingToExport)));
        assert_eq!(session.stats().created_at, session.created_at());
    }

    #[tokio::test]
    async fn processing_n_files_records_n_names() {
        let (services, _, _) = services();
        let mut session = keyed_session();
        let outcome = session
            .process_files(
                &services,
                vec![
                    upload("rust.pdf", "Rust has ownership and borrowing."),
                    upload("go.pdf", "Go has goroutines.\u{c}Channels connect goroutines."),
                    upload("empty.pdf", "   "),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.files, vec!["rust.pdf", "go.pdf", "empty.pdf"]);
        assert_eq!(outcome.total_chunks, 3);
        assert_eq!(session.processed_files().len(), 3);
        assert_eq!(outcome.summary(), "Processed 3 files with 3 chunks!");
    }

    #[tokio::test]
    async fn reprocessing_replaces_file_list_and_index() {
        let (services, _, _) = services();
        let mut session = keyed_session();
        session
            .process_files(&services, vec![upload("a.pdf", "apples"), upload("b.pdf", "bananas")])
            .await
            .unwrap();
        session
            .process_files(&services, vec![upload("c.pdf", "cherries")])
            .await
            .unwrap();

        assert_eq!(session.processed_files(), ["c.pdf".to_string()]);

        let reply = session.ask("tell me about apples").await.unwrap();
        let sources = reply.sources.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "c.pdf");

        session.close().await;
        assert!(!session.has_index());
    }

    #[tokio::test]
    async fn failed_processing_keeps_previous_state() {
        let (services, _, _) = services();
        let mut session = keyed_session();
        session
            .process_files(&services, vec![upload("good.pdf", "useful content")])
            .await
            .unwrap();

        let err = session
            .process_files(&services, vec![upload("bad.pdf", "CORRUPT bytes")])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error processing files:"));
        assert_eq!(session.processed_files(), ["good.pdf".to_string()]);

        let reply = session.ask("useful?").await.unwrap();
        assert_eq!(reply.sources.unwrap()[0].source, "good.pdf");
    }

    #[tokio::test]
    async fn rejects_non_pdf_and_path_components() {
        let (services, _, _) = services();
        let mut session = keyed_session();

        let err = session
            .process_files(&services, vec![upload("notes.txt", "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFile(name) if name == "notes.txt"));

        let outcome = session
            .process_files(&services, vec![upload("../../etc/report.pdf", "report body")])
            .await
            .unwrap();
        assert_eq!(outcome.files, vec!["report.pdf"]);

        let err = session.process_files(&services, vec![]).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn processing_requires_api_key() {
        let (services, _, _) = services();
        let mut session = Session::new(RagSettings::default());
        let err = session
            .process_files(&services, vec![upload("a.pdf", "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingApiKey));
    }

    #[tokio::test]
    async fn ask_checks_documents_before_api_key() {
        let mut session = Session::new(RagSettings::default());
        assert!(matches!(session.ask("hi").await, Err(SessionError::NoDocuments)));

        let (services, _, _) = services();
        let mut session = keyed_session();
        session
            .process_files(&services, vec![upload("a.pdf", "text")])
            .await
            .unwrap();
        session
            .update_settings(SettingsPatch { api_key: Some(String::new()), ..Default::default() }, &[])
            .unwrap();
        assert!(matches!(session.ask("hi").await, Err(SessionError::MissingApiKey)));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn ask_appends_user_and_assistant_turns() {
        let (services, factory, _) = services();
        let mut session = keyed_session();
        session
            .process_files(
                &services,
                vec![upload("guide.pdf", "Install with cargo install.\u{c}Configure the port in config.toml.")],
            )
            .await
            .unwrap();

        let reply = session.ask("  how do I configure the port?  ").await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Answer drawn from 2 passages.");

        let sources = reply.sources.clone().unwrap();
        assert_eq!(sources[0].page, 2);
        assert_eq!(sources[0].text_preview, "Configure the port in config.toml.");

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0], ChatMessage::user("how do I configure the port?"));
        assert_eq!(session.messages()[1], reply);
        assert_eq!(factory.provider.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn k_results_limits_sources() {
        let (services, _, _) = services();
        let mut session = keyed_session();
        let pages: Vec<String> = (0..8).map(|i| format!("page {} text", i)).collect();
        session
            .process_files(&services, vec![upload("many.pdf", &pages.join("\u{c}"))])
            .await
            .unwrap();
        session
            .update_settings(SettingsPatch { k_results: Some(3), ..Default::default() }, &[])
            .unwrap();

        let reply = session.ask("text").await.unwrap();
        assert_eq!(reply.sources.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_query_keeps_the_question() {
        let (services, _, _) = services();
        let mut session = keyed_session();
        session
            .process_files(&services, vec![upload("a.pdf", "explode the model")])
            .await
            .unwrap();

        let err = session.ask("explode").await.unwrap_err();
        assert!(err.to_string().starts_with("Error: "));
        assert_eq!(session.messages(), [ChatMessage::user("explode")]);
    }

    #[tokio::test]
    async fn clear_and_export() {
        let (services, _, _) = services();
        let mut session = keyed_session();
        session
            .process_files(&services, vec![upload("a.pdf", "alpha beta")])
            .await
            .unwrap();
        session.ask("alpha?").await.unwrap();

        let export = session.export(now()).unwrap();
        assert_eq!(export.files, vec!["a.pdf"]);
        assert_eq!(export.messages, session.messages());

        let stats = session.stats();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.chat_messages, 2);

        session.clear_history();
        assert!(session.messages().is_empty());
        assert_eq!(session.processed_files().len(), 1);
        assert!(matches!(session.export(now()), Err(SessionError::NothingToExport)));
    }
}

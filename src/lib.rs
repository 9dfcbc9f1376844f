pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod llm;
pub mod providers;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export commonly used items
pub use api::{create_api, AppState};
pub use config::{ProviderConfig, RagSettings, SettingsPatch};
pub use llm::rag::{QueryResponse, RagSystem};
pub use session::{RagServices, Session, SessionError, SessionStore};

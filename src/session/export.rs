use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Downloadable snapshot of a session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExport {
    pub export_date: String,
    pub files: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

impl ChatExport {
    pub fn new(files: Vec<String>, messages: Vec<ChatMessage>, now: NaiveDateTime) -> Self {
        Self {
            export_date: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            files,
            messages,
        }
    }

    pub fn file_name(now: NaiveDateTime) -> String {
        format!("chat_history_{}.json", now.format("%Y%m%d_%H%M%S"))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

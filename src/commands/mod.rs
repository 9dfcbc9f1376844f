use chrono::Local;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{RagSettings, SettingsPatch};
use crate::session::{ChatExport, RagServices, Session, SessionError};

mod document;
mod system;

pub use system::print_help;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Exit,
}

/// Drives one chat session from the terminal.
pub struct CommandHandler {
    session: Session,
    services: RagServices,
}

impl CommandHandler {
    pub fn new(services: RagServices, settings: RagSettings) -> Self {
        Self {
            session: Session::new(settings),
            services,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<CommandOutcome, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(CommandOutcome::Continue);
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "help" | "exit" | "quit" => return system::handle_command(command),
            "stats" => {
                system::print_stats(&self.session.stats());
                return Ok(CommandOutcome::Continue);
            }
            "load" => {
                document::load_files(&mut self.session, &self.services, rest).await?;
                return Ok(CommandOutcome::Continue);
            }
            "files" => {
                document::list_files(&self.session);
                return Ok(CommandOutcome::Continue);
            }
            "clear" => {
                self.session.clear_history();
                println!("🧹 {}", "Chat history cleared".green());
                return Ok(CommandOutcome::Continue);
            }
            "export" => {
                let path = self.export_history(rest).await?;
                println!("💾 Chat history exported to {}", path.display().to_string().bright_yellow());
                return Ok(CommandOutcome::Continue);
            }
            "set" => {
                self.update_setting(rest)?;
                return Ok(CommandOutcome::Continue);
            }
            "ask" => {
                self.handle_chat(rest).await?;
                return Ok(CommandOutcome::Continue);
            }
            _ => {}
        }

        // Default to a question about the loaded documents
        self.handle_chat(input).await?;
        Ok(CommandOutcome::Continue)
    }

    async fn handle_chat(&mut self, question: &str) -> Result<(), String> {
        let reply = self.session.ask(question).await.map_err(|e| match e {
            SessionError::NoDocuments => format!("{} Use 'load <file.pdf>' first.", e),
            other => other.to_string(),
        })?;

        println!("\n{}", reply.content.truecolor(255, 236, 179));

        if let Some(sources) = reply.sources.as_ref().filter(|s| !s.is_empty()) {
            println!("\n📚 {}", "Sources:".bold());
            for (i, source) in sources.iter().enumerate() {
                println!(
                    "  {}. {} (Page {})",
                    i + 1,
                    source.source.bright_cyan(),
                    source.page
                );
                println!("     {}", source.text_preview.dimmed());
            }
        }
        println!();
        Ok(())
    }

    async fn export_history(&self, target: &str) -> Result<PathBuf, String> {
        let now = Local::now().naive_local();
        let export = self.session.export(now).map_err(|e| e.to_string())?;
        let json = export
            .to_json()
            .map_err(|e| format!("Failed to serialize chat history: {}", e))?;

        let path = if target.is_empty() {
            PathBuf::from(ChatExport::file_name(now))
        } else {
            PathBuf::from(target)
        };

        tokio::fs::write(&path, json)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }

    fn update_setting(&mut self, args: &str) -> Result<(), String> {
        let (key, value) = args
            .split_once(char::is_whitespace)
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or("Usage: set <k|chunk|overlap|model|key> <value>")?;

        let patch = parse_setting(key, value)?;
        let models = self.services.factory.available_models();
        self.session
            .update_settings(patch, &models)
            .map_err(|e| e.to_string())?;

        if self.session.has_index() && matches!(key, "chunk" | "overlap") {
            println!("{}", "Chunking changes apply the next time files are loaded.".yellow());
        }
        println!("⚙️  {} updated", key.cyan());
        Ok(())
    }
}

/// Maps a `set` command onto a settings patch.
pub fn parse_setting(key: &str, value: &str) -> Result<SettingsPatch, String> {
    let number = || {
        value
            .parse::<usize>()
            .map_err(|_| format!("'{}' expects a number, got '{}'", key, value))
    };

    let mut patch = SettingsPatch::default();
    match key.to_lowercase().as_str() {
        "k" | "k_results" => patch.k_results = Some(number()?),
        "chunk" | "chunk_size" => patch.chunk_size = Some(number()?),
        "overlap" | "chunk_overlap" => patch.chunk_overlap = Some(number()?),
        "model" => patch.model = Some(value.to_string()),
        "key" | "api_key" => patch.api_key = Some(value.to_string()),
        other => return Err(format!("Unknown setting: {}", other)),
    }
    Ok(patch)
}

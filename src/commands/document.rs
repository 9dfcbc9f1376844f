use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::document::file_name_of;
use crate::session::{RagServices, Session, UploadedFile};

pub async fn load_files(
    session: &mut Session,
    services: &RagServices,
    args: &str,
) -> Result<(), String> {
    let paths: Vec<&str> = args.split_whitespace().collect();
    if paths.is_empty() {
        return Err("Usage: load <file.pdf> [more.pdf ...]".to_string());
    }

    let mut uploads = Vec::with_capacity(paths.len());
    for path in &paths {
        let path = Path::new(path);
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        uploads.push(UploadedFile {
            name: file_name_of(path),
            data,
        });
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Processing PDFs...");

    let result = session.process_files(services, uploads).await;
    pb.finish_and_clear();

    let outcome = result.map_err(|e| e.to_string())?;
    println!("✅ {}", outcome.summary().green());
    Ok(())
}

pub fn list_files(session: &Session) {
    let files = session.processed_files();
    if files.is_empty() {
        println!("No files processed yet. Use 'load <file.pdf>' to add some.");
        return;
    }

    println!("\n📁 Processed Files:");
    for file in files {
        println!("  📄 {}", file.bright_yellow());
    }
    println!();
}

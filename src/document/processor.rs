use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to extract text from {0}: {1}")]
    Extraction(String, String),
}

/// Text of one page, numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub source: String,
    pub page: u32,
    pub text: String,
}

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, DocumentError>;
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    fn extract_pages(path: PathBuf) -> Result<Vec<String>, String> {
        // pdf-extract panics on some malformed fonts
        match std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(&path)) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("PDF parser panicked".to_string()),
        }
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, DocumentError> {
        let source = file_name_of(path);
        if !is_pdf(path) {
            return Err(DocumentError::Unsupported(source));
        }

        tokio::fs::metadata(path).await.map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || Self::extract_pages(owned))
            .await
            .map_err(|e| DocumentError::Extraction(source.clone(), e.to_string()))?
            .map_err(|e| DocumentError::Extraction(source.clone(), e))?;

        let total = pages.len();
        let pages: Vec<DocumentPage> = pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| DocumentPage {
                source: source.clone(),
                page: i as u32 + 1,
                text,
            })
            .collect();

        if pages.is_empty() {
            warn!(file = %source, "No extractable text found");
        }
        debug!(file = %source, pages = total, text_pages = pages.len(), "Extracted PDF");

        Ok(pages)
    }
}

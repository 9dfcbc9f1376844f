use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::database::vector_db::VectorStore;
use crate::document::{DocumentLoader, TextChunker};
use crate::llm::embeddings::EmbeddingGenerator;
use crate::llm::semantic_search::{SearchResult, SemanticSearch};
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::text_preview;
use crate::session::SourceRef;

pub const PREVIEW_CHARS: usize = 200;
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in the processed documents to answer that question.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Indexes PDFs for one session and answers questions against them.
pub struct RagSystem {
    provider: Arc<dyn CompletionProvider + Send + Sync>,
    embeddings: EmbeddingGenerator,
    search: SemanticSearch,
    loader: Arc<dyn DocumentLoader>,
    chunker: TextChunker,
}

impl RagSystem {
    pub fn new(
        provider: Arc<dyn CompletionProvider + Send + Sync>,
        store: Arc<dyn VectorStore>,
        loader: Arc<dyn DocumentLoader>,
        chunk_size: usize,
        chunk_overlap: usize,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embeddings: EmbeddingGenerator::new(provider.clone()),
            provider,
            search: SemanticSearch::new(store, collection),
            loader,
            chunker: TextChunker::new(chunk_size, chunk_overlap),
        }
    }

    /// Loads, chunks and embeds every file, replacing the previous index.
    /// Returns the number of indexed chunks.
    pub async fn process_pdfs(&self, paths: &[PathBuf]) -> Result<usize> {
        let start = Instant::now();
        let mut pages = Vec::new();

        for path in paths {
            let loaded = self.loader.load(path).await?;
            if loaded.is_empty() {
                warn!(file = %path.display(), "File produced no text");
            }
            pages.extend(loaded);
        }

        let chunks = self.chunker.chunk_pages(&pages);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embeddings.generate_batch_embeddings(&texts).await?;
        let count = self.search.index_chunks(&chunks, embeddings).await?;

        info!(
            collection = %self.search.collection_name(),
            files = paths.len(),
            pages = pages.len(),
            chunks = count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Documents indexed"
        );

        Ok(count)
    }

    /// Drops this engine's index from the vector store.
    pub async fn discard(&self) -> Result<()> {
        self.search.clear().await
    }

    pub async fn query(&self, text: &str, k: usize) -> Result<QueryResponse> {
        let question = text.trim();
        if question.is_empty() {
            return Err(Error::msg("Question is empty"));
        }

        let query_embedding = self.embeddings.generate_embedding(question).await?;
        let results = self.search.search(query_embedding, k.max(1) as u64).await?;

        if results.is_empty() {
            info!(collection = %self.search.collection_name(), "No matching chunks for question");
            return Ok(QueryResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(question, &results);
        let answer = self.provider.complete(&prompt).await?;

        info!(
            collection = %self.search.collection_name(),
            retrieved = results.len(),
            "Question answered"
        );

        Ok(QueryResponse {
            answer: answer.trim().to_string(),
            sources: results.iter().map(source_ref).collect(),
        })
    }
}

fn source_ref(result: &SearchResult) -> SourceRef {
    SourceRef {
        source: result.source.clone(),
        page: result.page,
        text_preview: text_preview(&result.text, PREVIEW_CHARS),
    }
}

pub fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    let mut context = String::new();
    for (i, result) in results.iter().enumerate() {
        context.push_str(&format!(
            "[{}] {} (Page {})\n{}\n\n",
            i + 1,
            result.source,
            result.page,
            result.text
        ));
    }

    format!(
        "Context from the documents:\n\n{}Question: {}\n\nAnswer:",
        context,
        question
    )
}

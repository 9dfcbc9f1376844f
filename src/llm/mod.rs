pub mod embeddings;
pub mod rag;
pub mod semantic_search;

pub use embeddings::EmbeddingGenerator;
pub use rag::{QueryResponse, RagSystem};
pub use semantic_search::{SearchResult, SemanticSearch};

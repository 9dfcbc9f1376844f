pub mod vector_db;
#[cfg(feature = "qdrant")]
pub mod qdrant;
#[cfg(feature = "qdrant")]
pub mod qdrant_config;

pub use vector_db::{InMemoryVectorDB, Payload, ScoredPoint, VectorDBError, VectorStore};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorDB;

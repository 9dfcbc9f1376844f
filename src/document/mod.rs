mod chunker;
mod processor;

pub use chunker::{DocumentChunk, TextChunker};
pub use processor::{file_name_of, is_pdf, DocumentError, DocumentLoader, DocumentPage, PdfLoader};

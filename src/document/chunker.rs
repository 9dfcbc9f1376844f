use super::processor::DocumentPage;

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub chunk_index: usize,
}

/// Splits page text into word-aligned chunks of at most `chunk_size`
/// characters, repeating up to `chunk_overlap` characters of trailing words
/// at the start of the next chunk.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_pages(&self, pages: &[DocumentPage]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        let mut chunk_idx = 0;

        for page in pages {
            for text in self.chunk(&page.text) {
                chunks.push(DocumentChunk {
                    text,
                    source: page.source.clone(),
                    page: page.page,
                    chunk_index: chunk_idx,
                });
                chunk_idx += 1;
            }
        }

        chunks
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let lengths: Vec<usize> = words.iter().map(|w| w.chars().count()).collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            // Always take at least one word, even if it alone exceeds the budget
            let mut end = start + 1;
            let mut len = lengths[start];
            while end < words.len() && len + 1 + lengths[end] <= self.chunk_size {
                len += 1 + lengths[end];
                end += 1;
            }

            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }

            // Step back over trailing words that fit in the overlap, keeping progress
            let mut next = end;
            let mut overlap = 0;
            while next > start + 1 {
                let add = lengths[next - 1] + usize::from(overlap > 0);
                if overlap + add > self.chunk_overlap {
                    break;
                }
                overlap += add;
                next -= 1;
            }
            // An overlap that leaves no room for the next word would only repeat old words
            if next < end && overlap + 1 + lengths[end] > self.chunk_size {
                next = end;
            }
            start = next;
        }

        chunks
    }
}

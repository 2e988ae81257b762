//! Corpus snapshot for lexical scoring.
//!
//! Chunks are loaded from the vector index in one scroll and the BM25 index
//! is built over their contents in the same order, so a positional hit maps
//! straight back to its payload. The snapshot is immutable; the retriever
//! swaps in a fresh one on reload.

use ragdb_core::types::{DocumentChunk, SearchResult, SearchType};
use ragdb_lexical::{tokenize, Bm25Index};

pub(crate) struct CorpusIndex {
    chunks: Vec<DocumentChunk>,
    bm25: Option<Bm25Index>,
}

impl CorpusIndex {
    pub(crate) fn build(chunks: Vec<DocumentChunk>) -> Self {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.content)).collect();
        let bm25 = Bm25Index::build(&tokenized);
        if bm25.is_none() {
            tracing::info!("corpus snapshot is empty; keyword search disabled");
        }
        Self { chunks, bm25 }
    }

    pub(crate) fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            bm25: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn has_lexical_index(&self) -> bool {
        self.bm25.is_some()
    }

    /// Top-k keyword hits with full payload, raw BM25 scores, strictly
    /// positive.
    pub(crate) fn keyword_hits(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let Some(bm25) = &self.bm25 else {
            return Vec::new();
        };
        let query_tokens = tokenize(query);
        bm25.top_k(&query_tokens, k)
            .into_iter()
            .map(|(position, score)| {
                SearchResult::from_chunk(&self.chunks[position], score, SearchType::Keyword)
            })
            .collect()
    }
}

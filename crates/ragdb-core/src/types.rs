//! Domain types shared by the lexical, vector and hybrid engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ChunkId = String;

/// Open key/value payload carried through indexing and retrieval verbatim.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A chunk of a source document, the atomic unit of indexing and retrieval.
///
/// - `id`: globally unique chunk identifier, assigned once at ingestion
/// - `content`: the text payload, never empty
/// - `source_file`: originating document name; repeats across chunks
/// - `chunk_index`: 0-based position within the source, contiguous per file
/// - `metadata`: arbitrary payload preserved through storage and search
/// - `embedding`: dense vector, attached after embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub content: String,
    pub source_file: String,
    pub chunk_index: usize,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Which retrieval strategy produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Keyword,
    Hybrid,
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchType::Semantic => write!(f, "semantic"),
            SearchType::Keyword => write!(f, "keyword"),
            SearchType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// One ranked search hit with full payload.
///
/// `score` semantics depend on `search_type`: cosine similarity for
/// `Semantic`, raw BM25 for `Keyword`, and a weighted blend of the two
/// normalized sub-scores for `Hybrid`. The sub-scores are only populated on
/// hybrid results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: ChunkId,
    pub content: String,
    pub source_file: String,
    pub chunk_index: usize,
    pub metadata: Metadata,
    pub score: f32,
    pub search_type: SearchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,
}

impl SearchResult {
    /// Build a result from a stored chunk, tagging the producing strategy.
    pub fn from_chunk(chunk: &DocumentChunk, score: f32, search_type: SearchType) -> Self {
        Self {
            id: chunk.id.clone(),
            content: chunk.content.clone(),
            source_file: chunk.source_file.clone(),
            chunk_index: chunk.chunk_index,
            metadata: chunk.metadata.clone(),
            score,
            search_type,
            semantic_score: None,
            keyword_score: None,
        }
    }
}

/// A nearest-neighbor hit returned by a vector index.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// One equality condition over a payload field.
///
/// `field` names either a dedicated column (`id`, `source_file`,
/// `chunk_index`) or a key inside the open metadata map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    pub value: serde_json::Value,
}

/// Conjunction of equality conditions applied to stored payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadFilter {
    pub conditions: Vec<FieldCondition>,
}

impl PayloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition; chainable.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a chunk satisfies every condition.
    pub fn matches(&self, chunk: &DocumentChunk) -> bool {
        self.conditions.iter().all(|cond| match cond.field.as_str() {
            "id" => cond.value.as_str() == Some(chunk.id.as_str()),
            "source_file" => cond.value.as_str() == Some(chunk.source_file.as_str()),
            "chunk_index" => cond.value.as_u64() == Some(chunk.chunk_index as u64),
            key => chunk.metadata.get(key) == Some(&cond.value),
        })
    }
}

/// Summary of a vector collection, used for health checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub vector_count: usize,
    pub status: String,
}

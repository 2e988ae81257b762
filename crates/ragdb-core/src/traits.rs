//! Collaborator contracts consumed by the hybrid retriever.
//!
//! Both collaborators are remote or otherwise I/O-bound, so the traits are
//! async. Implementations report failures through `anyhow`; the retriever
//! maps them into the [`crate::error::Error`] taxonomy at its boundary.

use async_trait::async_trait;

use crate::types::{CollectionInfo, DocumentChunk, PayloadFilter, ScoredPoint};

/// Maps text to dense vectors of a fixed dimensionality.
///
/// The backend (remote API, local model, deterministic fake) is chosen once
/// at construction; callers never branch on it afterwards.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the backend/model (e.g. `remote:text-embedding-3-small:d1536`).
    fn id(&self) -> &str;

    /// Embedding dimensionality (D). Every vector this embedder returns has this length.
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Stores chunk payloads with their vectors and answers nearest-neighbor
/// queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace chunks by id. `chunks` and `embeddings` are parallel
    /// slices of equal length.
    async fn upsert(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;

    /// Nearest-neighbor query. Returns up to `limit` hits with similarity
    /// `>= score_threshold`, sorted by similarity descending, each carrying
    /// full payload.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&PayloadFilter>,
    ) -> anyhow::Result<Vec<ScoredPoint>>;

    /// Delete every chunk matching the filter (e.g. all chunks of one source
    /// file).
    async fn delete_by_filter(&self, filter: &PayloadFilter) -> anyhow::Result<()>;

    /// Page through stored chunks with payload, in a stable order. Used to
    /// load the corpus snapshot for lexical indexing.
    async fn scroll(&self, limit: usize) -> anyhow::Result<Vec<DocumentChunk>>;

    async fn collection_info(&self) -> anyhow::Result<CollectionInfo>;
}

//! Hybrid retrieval: dense vector similarity fused with BM25 keyword
//! scoring.
//!
//! [`HybridRetriever`] owns an immutable corpus snapshot for lexical
//! scoring, drives the embedding client and vector index for the semantic
//! side, and merges both candidate sets with [`combine_and_rerank`]. The
//! snapshot is loaded once at initialization and only replaced wholesale by
//! [`HybridRetriever::reload`], so reads never lock against a rebuild in
//! progress.

mod fusion;
mod snapshot;

pub use fusion::combine_and_rerank;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::timeout;

use ragdb_core::config::{RetrievalConfig, MAX_TOP_K};
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{PayloadFilter, SearchResult, SearchType};

use snapshot::CorpusIndex;

/// Knobs for one hybrid query.
#[derive(Debug, Clone)]
pub struct HybridParams {
    pub top_k: usize,
    /// Minimum cosine similarity for the semantic branch.
    pub threshold: f32,
    /// Equality filter applied to the semantic branch only.
    pub filter: Option<PayloadFilter>,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
}

impl Default for HybridParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 0.7,
            filter: None,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
        }
    }
}

impl HybridParams {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            threshold: config.threshold,
            filter: None,
            semantic_weight: config.semantic_weight,
            keyword_weight: config.keyword_weight,
        }
    }
}

pub struct HybridRetriever {
    vector: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    corpus: RwLock<Arc<CorpusIndex>>,
    snapshot_limit: usize,
    branch_timeout: Duration,
}

impl HybridRetriever {
    /// Connect to the collaborators and load the corpus snapshot.
    ///
    /// An unreachable vector index is fatal here; the retriever must not
    /// serve queries it cannot answer. A failed snapshot load is not:
    /// keyword search degrades to empty and a warning is logged.
    pub async fn initialize(
        vector: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let info = vector.collection_info().await.map_err(|e| {
            Error::VectorIndex(format!("collection unavailable at startup: {e}"))
        })?;
        tracing::info!(
            vectors = info.vector_count,
            status = %info.status,
            embedder = embedder.id(),
            "vector index reachable"
        );

        let corpus = match load_corpus(vector.as_ref(), config.snapshot_limit).await {
            Ok(corpus) => corpus,
            Err(e) => {
                tracing::warn!(error = %e, "corpus snapshot load failed; keyword search will return empty");
                CorpusIndex::empty()
            }
        };
        tracing::info!(chunks = corpus.len(), "corpus snapshot ready");

        Ok(Self {
            vector,
            embedder,
            corpus: RwLock::new(Arc::new(corpus)),
            snapshot_limit: config.snapshot_limit,
            branch_timeout: Duration::from_millis(config.branch_timeout_ms),
        })
    }

    /// Rebuild the corpus snapshot from the vector index and swap it in.
    /// Queries running concurrently keep reading the old snapshot.
    pub async fn reload(&self) -> Result<()> {
        let corpus = load_corpus(self.vector.as_ref(), self.snapshot_limit)
            .await
            .map_err(|e| Error::Lexical(format!("snapshot reload failed: {e}")))?;
        tracing::info!(chunks = corpus.len(), "corpus snapshot rebuilt");
        *self.corpus.write().expect("corpus lock poisoned") = Arc::new(corpus);
        Ok(())
    }

    fn corpus(&self) -> Arc<CorpusIndex> {
        self.corpus.read().expect("corpus lock poisoned").clone()
    }

    /// Dense similarity search. Every returned score is `>= threshold`.
    pub async fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<SearchResult>> {
        validate_top_k(top_k)?;
        validate_threshold(threshold)?;
        self.semantic_candidates(query, top_k, threshold, filter).await
    }

    async fn semantic_candidates(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<SearchResult>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;
        let points = self
            .vector
            .search(&vector, limit, threshold, filter)
            .await
            .map_err(|e| Error::VectorIndex(e.to_string()))?;
        Ok(points
            .into_iter()
            .map(|p| SearchResult::from_chunk(&p.chunk, p.score, SearchType::Semantic))
            .collect())
    }

    /// BM25 search over the corpus snapshot. Every returned score is `> 0`.
    ///
    /// `filter` is accepted for API symmetry but not applied: metadata
    /// filtering is a semantic-search feature, lexical scoring always ranks
    /// the whole snapshot.
    pub async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        _filter: Option<&PayloadFilter>,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(Error::InvalidParam("top_k must be positive".to_string()));
        }
        Ok(self.corpus().keyword_hits(query, top_k))
    }

    /// Fan out to both strategies, fuse, and cap at `top_k`.
    ///
    /// Both branches over-fetch `2 × top_k` candidates so fusion can re-rank
    /// before truncation. The semantic branch runs under the configured
    /// timeout; if it fails or times out while a lexical index exists, the
    /// query degrades to keyword-only results instead of failing outright.
    pub async fn hybrid_search(
        &self,
        query: &str,
        params: &HybridParams,
    ) -> Result<Vec<SearchResult>> {
        validate_top_k(params.top_k)?;
        validate_threshold(params.threshold)?;
        if params.semantic_weight < 0.0 || params.keyword_weight < 0.0 {
            return Err(Error::InvalidParam(
                "weights must be non-negative".to_string(),
            ));
        }

        let fetch = params.top_k * 2;
        let corpus = self.corpus();
        let (semantic_branch, keyword) = tokio::join!(
            timeout(
                self.branch_timeout,
                self.semantic_candidates(query, fetch, params.threshold, params.filter.as_ref()),
            ),
            async { corpus.keyword_hits(query, fetch) },
        );

        let semantic = match semantic_branch {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                if !corpus.has_lexical_index() {
                    return Err(e);
                }
                tracing::warn!(error = %e, "semantic branch failed; serving keyword-only results");
                Vec::new()
            }
            Err(_) => {
                if !corpus.has_lexical_index() {
                    return Err(Error::VectorIndex(format!(
                        "semantic branch timed out after {:?}",
                        self.branch_timeout
                    )));
                }
                tracing::warn!(timeout = ?self.branch_timeout, "semantic branch timed out; serving keyword-only results");
                Vec::new()
            }
        };

        let mut fused = combine_and_rerank(
            semantic,
            keyword,
            params.semantic_weight,
            params.keyword_weight,
        );
        fused.truncate(params.top_k);
        Ok(fused)
    }
}

async fn load_corpus(vector: &dyn VectorIndex, limit: usize) -> anyhow::Result<CorpusIndex> {
    let chunks = vector.scroll(limit).await?;
    Ok(CorpusIndex::build(chunks))
}

fn validate_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 || top_k > MAX_TOP_K {
        return Err(Error::InvalidParam(format!(
            "top_k must be in 1..={MAX_TOP_K}, got {top_k}"
        )));
    }
    Ok(())
}

fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidParam(format!(
            "threshold must be in [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

//! In-memory vector index for tests and small corpora.
//!
//! Brute-force cosine similarity over rows held behind an `RwLock`.
//! Insertion order is the scroll order, which keeps snapshot loading
//! deterministic in tests.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{CollectionInfo, DocumentChunk, PayloadFilter, ScoredPoint};

struct MemoryRow {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

#[derive(Default)]
pub struct MemoryVectorIndex {
    rows: RwLock<Vec<MemoryRow>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "chunks and embeddings length mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            );
        }
        let mut rows = self.rows.write().expect("memory index lock poisoned");
        for (chunk, vector) in chunks.iter().zip(embeddings.iter()) {
            if let Some(existing) = rows.iter_mut().find(|r| r.chunk.id == chunk.id) {
                existing.chunk = chunk.clone();
                existing.vector = vector.clone();
            } else {
                rows.push(MemoryRow {
                    chunk: chunk.clone(),
                    vector: vector.clone(),
                });
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let rows = self.rows.read().expect("memory index lock poisoned");
        let mut hits: Vec<ScoredPoint> = rows
            .iter()
            .filter(|row| filter.map_or(true, |f| f.matches(&row.chunk)))
            .map(|row| ScoredPoint {
                chunk: row.chunk.clone(),
                score: cosine_similarity(vector, &row.vector),
            })
            .filter(|p| p.score >= score_threshold)
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_by_filter(&self, filter: &PayloadFilter) -> Result<()> {
        if filter.is_empty() {
            anyhow::bail!("refusing to delete without any filter condition");
        }
        let mut rows = self.rows.write().expect("memory index lock poisoned");
        rows.retain(|row| !filter.matches(&row.chunk));
        Ok(())
    }

    async fn scroll(&self, limit: usize) -> Result<Vec<DocumentChunk>> {
        let rows = self.rows.read().expect("memory index lock poisoned");
        Ok(rows.iter().take(limit).map(|r| r.chunk.clone()).collect())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let rows = self.rows.read().expect("memory index lock poisoned");
        Ok(CollectionInfo {
            vector_count: rows.len(),
            status: "ready".to_string(),
        })
    }
}

//! Embedding backends behind the [`Embedder`] trait.
//!
//! Three implementations: an OpenAI-compatible HTTP client, a local BERT
//! model run through candle, and a deterministic hashing embedder for tests
//! and offline development. [`create_embedder`] picks one from configuration
//! exactly once; nothing downstream branches on the backend again.

mod device;
mod fake;
mod local;
mod pooling;
mod remote;

use std::sync::Arc;

use anyhow::Result;
use ragdb_core::config::EmbeddingConfig;
use ragdb_core::traits::Embedder;

pub use fake::FakeEmbedder;
pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

/// Instantiate the backend named by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "remote" => Ok(Arc::new(RemoteEmbedder::new(config)?)),
        "local" => Ok(Arc::new(LocalEmbedder::load(config)?)),
        "fake" => Ok(Arc::new(FakeEmbedder::new(config.dim))),
        other => anyhow::bail!("unknown embedding provider: {other}"),
    }
}

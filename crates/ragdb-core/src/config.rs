//! Typed configuration loaded from `ragdb.toml` merged with `RAGDB_*`
//! environment variables (nested keys split on `__`, e.g.
//! `RAGDB_EMBEDDING__PROVIDER=remote`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Upper bound on `top_k` for semantic queries.
pub const MAX_TOP_K: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// LanceDB database directory (created on first write).
    pub db_dir: String,
    /// Table holding chunk payloads and vectors.
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend selected once at startup: `remote`, `local`, or `fake`.
    pub provider: String,
    /// Model name sent to the remote API or announced by the local backend.
    pub model: String,
    /// Embedding dimensionality; every vector in the collection has this length.
    pub dim: usize,
    /// Base URL of the OpenAI-compatible embeddings endpoint.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout for the remote backend.
    pub timeout_secs: u64,
    /// Retry attempts for rate-limit and server errors.
    pub max_retries: u32,
    /// Directory with tokenizer.json, config.json and model.safetensors for
    /// the local backend.
    pub model_dir: Option<String>,
    /// Token window for the local backend.
    pub max_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub threshold: f32,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    /// Maximum number of chunks loaded into the corpus snapshot.
    pub snapshot_limit: usize,
    /// Timeout for the semantic branch of a hybrid query.
    pub branch_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_dir: "./data/lancedb".to_string(),
            table: "chunks".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fake".to_string(),
            model: "text-embedding-3-small".to_string(),
            dim: 384,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            model_dir: None,
            max_len: 256,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 0.7,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            snapshot_limit: 10_000,
            branch_timeout_ms: 5_000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `ragdb.toml` (if present) merged with `RAGDB_*` env vars.
    /// Missing keys fall back to the defaults above.
    pub fn load() -> anyhow::Result<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file("ragdb.toml"))
            .merge(Env::prefixed("RAGDB_").split("__"))
            .extract()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.embedding.dim == 0 {
            anyhow::bail!("embedding.dim must be positive");
        }
        match self.embedding.provider.as_str() {
            "remote" | "local" | "fake" => {}
            other => anyhow::bail!("unknown embedding provider: {other}"),
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_k > MAX_TOP_K {
            anyhow::bail!(
                "retrieval.top_k must be in 1..={MAX_TOP_K}, got {}",
                self.retrieval.top_k
            );
        }
        if !(0.0..=1.0).contains(&self.retrieval.threshold) {
            anyhow::bail!(
                "retrieval.threshold must be in [0, 1], got {}",
                self.retrieval.threshold
            );
        }
        if self.retrieval.semantic_weight < 0.0 || self.retrieval.keyword_weight < 0.0 {
            anyhow::bail!("retrieval weights must be non-negative");
        }
        Ok(())
    }
}

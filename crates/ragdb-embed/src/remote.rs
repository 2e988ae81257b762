//! OpenAI-compatible HTTP embedding client.
//!
//! Sends batches to `POST {api_base}/embeddings` and returns vectors in
//! input order. Rate limits (429) and server errors (5xx) are retried with
//! exponential backoff; other client errors fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use ragdb_core::config::EmbeddingConfig;
use ragdb_core::traits::Embedder;
use serde::{Deserialize, Serialize};

/// Texts per API request.
const BATCH_SIZE: usize = 128;

pub struct RemoteEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dim: usize,
    max_retries: u32,
    id: String,
}

impl RemoteEmbedder {
    /// Build a client from configuration. Fails if the API key env var named
    /// by `config.api_key_env` is unset.
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            dim: config.dim,
            max_retries: config.max_retries,
            id: format!("remote:{}:d{}", config.model, config.dim),
        })
    }

    async fn request_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.api_base);
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let mut attempt = 0u32;
        loop {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: EmbeddingsResponse = resp.json().await?;
                    return self.vectors_in_order(parsed, texts.len());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable || attempt >= self.max_retries {
                        let detail = resp.text().await.unwrap_or_default();
                        anyhow::bail!("embeddings API returned {status}: {detail}");
                    }
                    tracing::warn!(%status, attempt, "embeddings API transient error, retrying");
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(anyhow::anyhow!("embeddings request failed: {e}"));
                    }
                    tracing::warn!(error = %e, attempt, "embeddings request error, retrying");
                }
            }

            let backoff = Duration::from_secs(1 << attempt.min(5));
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    fn vectors_in_order(
        &self,
        parsed: EmbeddingsResponse,
        expected: usize,
    ) -> anyhow::Result<Vec<Vec<f32>>> {
        if parsed.data.len() != expected {
            anyhow::bail!(
                "embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                expected
            );
        }
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        for d in &data {
            if d.embedding.len() != self.dim {
                anyhow::bail!(
                    "embedding dimensionality mismatch: expected {}, got {}",
                    self.dim,
                    d.embedding.len()
                );
            }
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.request_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.request_batch(batch).await?);
        }
        Ok(out)
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

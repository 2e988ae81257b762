//! Local BERT embedder run through candle.
//!
//! Loads a sentence-transformer style checkpoint (tokenizer.json,
//! config.json, model.safetensors) from a local directory and produces
//! mean-pooled, L2-normalized sentence vectors.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use ragdb_core::config::EmbeddingConfig;
use ragdb_core::traits::Embedder;
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pooling::masked_mean_l2;

pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl LocalEmbedder {
    /// Load the model named by `config.model_dir` (or `RAGDB_MODEL_DIR`).
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let model_dir = resolve_model_dir(config)?;
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
        let model = BertModel::load(vb, &bert_config)?;

        let dim = bert_config.hidden_size;
        if config.dim != dim {
            anyhow::bail!(
                "configured embedding.dim {} does not match model hidden size {dim}",
                config.dim
            );
        }
        tracing::info!(model = %config.model, dim, "local embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dim,
            max_len: config.max_len,
            id: format!("local:{}:d{dim}", config.model),
        })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = self.tokenize_padded(text)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vector = pooled.squeeze(0)?.to_vec1::<f32>()?;
        Ok(vector)
    }

    fn tokenize_padded(&self, text: &str) -> Result<(Tensor, Tensor)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > self.max_len {
            ids.truncate(self.max_len);
            mask.truncate(self.max_len);
        }
        if ids.len() < self.max_len {
            let pad = self.max_len - ids.len();
            // BERT pad token id is 0
            ids.extend(std::iter::repeat(0).take(pad));
            mask.extend(std::iter::repeat(0).take(pad));
        }
        let input_ids = Tensor::from_iter(ids, &self.device)?.reshape((1, self.max_len))?;
        let attention_mask = Tensor::from_iter(mask, &self.device)?.reshape((1, self.max_len))?;
        Ok((input_ids, attention_mask))
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_text(text)?);
        }
        Ok(out)
    }
}

fn resolve_model_dir(config: &EmbeddingConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.model_dir {
        let p = PathBuf::from(dir);
        if p.exists() {
            return Ok(p);
        }
        anyhow::bail!("embedding.model_dir does not exist: {}", p.display());
    }
    if let Ok(dir) = std::env::var("RAGDB_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(anyhow!(
        "no local model directory configured (set embedding.model_dir or RAGDB_MODEL_DIR)"
    ))
}

use ragdb_core::config::EmbeddingConfig;
use ragdb_embed::{create_embedder, FakeEmbedder};

use ragdb_core::traits::Embedder;

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim matches construction");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6, "same input, same vector");
    }
}

#[tokio::test]
async fn fake_embedder_single_matches_batch() {
    let embedder = FakeEmbedder::new(64);
    let single = embedder.embed("rust search engine").await.expect("embed");
    let batch = embedder
        .embed_batch(&["rust search engine".to_string()])
        .await
        .expect("embed_batch");
    assert_eq!(single, batch[0]);
}

#[tokio::test]
async fn shared_tokens_correlate_vectors() {
    let embedder = FakeEmbedder::new(128);
    let a = embedder.embed("lora adaptation").await.expect("embed");
    let b = embedder.embed("lora").await.expect("embed");
    let c = embedder.embed("completely different words").await.expect("embed");

    let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
    assert!(
        dot(&a, &b) > dot(&c, &b),
        "overlapping vocabulary should yield higher similarity"
    );
}

#[test]
fn factory_selects_fake_backend() {
    let config = EmbeddingConfig {
        provider: "fake".to_string(),
        dim: 32,
        ..EmbeddingConfig::default()
    };
    let embedder = create_embedder(&config).expect("factory");
    assert_eq!(embedder.dim(), 32);
    assert_eq!(embedder.id(), "fake:d32");
}

#[test]
fn factory_rejects_unknown_backend() {
    let config = EmbeddingConfig {
        provider: "telepathy".to_string(),
        ..EmbeddingConfig::default()
    };
    assert!(create_embedder(&config).is_err());
}

#[test]
fn factory_remote_requires_api_key() {
    let config = EmbeddingConfig {
        provider: "remote".to_string(),
        api_key_env: "RAGDB_TEST_KEY_THAT_IS_NOT_SET".to_string(),
        ..EmbeddingConfig::default()
    };
    assert!(create_embedder(&config).is_err(), "missing key is a construction error");
}

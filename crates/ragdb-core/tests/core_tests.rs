use std::fs;
use std::path::Path;
use tempfile::TempDir;

use ragdb_core::chunker::{Chunker, ChunkingConfig};
use ragdb_core::config::AppConfig;
use ragdb_core::types::{DocumentChunk, PayloadFilter};

#[test]
fn chunker_single_small_file() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "Short text\n").expect("write");

    let chunker = Chunker::new();
    let chunks = chunker.process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(chunks[0].content.trim(), "Short text");
    assert_eq!(chunks[0].id, "a:0");
    assert_eq!(chunks[0].source_file, "a.txt");
    assert_eq!(chunks[0].chunk_index, 0);
}

#[test]
fn chunker_indices_contiguous_per_file() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha\n\nbravo\n\ncharlie").expect("write");
    fs::write(dir.join("b.md"), "delta\n\necho").expect("write");

    let chunks = Chunker::new().process_directory(dir).expect("process");

    let a: Vec<&DocumentChunk> = chunks.iter().filter(|c| c.source_file == "a.txt").collect();
    let b: Vec<&DocumentChunk> = chunks.iter().filter(|c| c.source_file == "b.md").collect();
    assert_eq!(a.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(b.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn chunker_splits_oversized_paragraph_with_overlap() {
    let config = ChunkingConfig {
        max_tokens: 20,
        overlap_percent: 0.2,
    };
    let chunker = Chunker::with_config(config);
    let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
    let text = words.join(" ");

    let chunks = chunker.chunk_text(&text, "big.txt", Path::new("big.txt"));

    assert!(chunks.len() > 1, "oversized paragraph splits into windows");
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i);
        assert!(!c.content.is_empty());
    }
    // adjacent windows share words
    let first_words: Vec<&str> = chunks[0].content.split_whitespace().collect();
    let second_words: Vec<&str> = chunks[1].content.split_whitespace().collect();
    assert!(first_words.iter().any(|w| second_words.contains(w)));
}

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default();
    config.validate().expect("defaults validate");
    assert_eq!(config.retrieval.top_k, 5);
    assert!((config.retrieval.semantic_weight - 0.7).abs() < 1e-6);
    assert!((config.retrieval.keyword_weight - 0.3).abs() < 1e-6);
}

#[test]
fn config_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.retrieval.top_k = 0;
    assert!(config.validate().is_err(), "top_k 0 rejected");

    let mut config = AppConfig::default();
    config.retrieval.threshold = 1.5;
    assert!(config.validate().is_err(), "threshold above 1 rejected");

    let mut config = AppConfig::default();
    config.embedding.provider = "carrier-pigeon".to_string();
    assert!(config.validate().is_err(), "unknown provider rejected");
}

#[test]
fn payload_filter_matches_columns_and_metadata() {
    let mut chunk = DocumentChunk {
        id: "doc:0".to_string(),
        content: "text".to_string(),
        source_file: "doc.txt".to_string(),
        chunk_index: 0,
        metadata: Default::default(),
        embedding: None,
    };
    chunk
        .metadata
        .insert("lang".to_string(), serde_json::json!("en"));

    assert!(PayloadFilter::new().eq("source_file", "doc.txt").matches(&chunk));
    assert!(PayloadFilter::new().eq("lang", "en").matches(&chunk));
    assert!(!PayloadFilter::new().eq("lang", "de").matches(&chunk));
    assert!(!PayloadFilter::new()
        .eq("source_file", "doc.txt")
        .eq("lang", "de")
        .matches(&chunk));
    assert!(PayloadFilter::new().eq("chunk_index", 0).matches(&chunk));
}

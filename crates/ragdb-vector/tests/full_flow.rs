use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{DocumentChunk, PayloadFilter};
use ragdb_embed::FakeEmbedder;
use ragdb_vector::LanceVectorIndex;

const DIM: usize = 64;

fn chunk(id: &str, content: &str, source: &str, index: usize) -> DocumentChunk {
    let mut metadata = ragdb_core::types::Metadata::new();
    metadata.insert("lang".to_string(), serde_json::json!("en"));
    DocumentChunk {
        id: id.to_string(),
        content: content.to_string(),
        source_file: source.to_string(),
        chunk_index: index,
        metadata,
        embedding: None,
    }
}

async fn seeded_store(dir: &std::path::Path) -> (LanceVectorIndex, Vec<DocumentChunk>) {
    let store = LanceVectorIndex::open(&dir.to_string_lossy(), "chunks", DIM)
        .await
        .expect("open store");
    let chunks = vec![
        chunk("guide:0", "lora adaptation fine-tunes large language models", "guide.txt", 0),
        chunk("guide:1", "gardening requires patience and good soil", "guide.txt", 1),
        chunk("notes:0", "lora rank decomposition saves memory", "notes.txt", 0),
    ];
    let embedder = FakeEmbedder::new(DIM);
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await.expect("embed");
    store.upsert(&chunks, &vectors).await.expect("upsert");
    (store, chunks)
}

#[tokio::test]
async fn upsert_search_scroll_delete_flow() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (store, chunks) = seeded_store(tmp.path()).await;

    let info = store.collection_info().await.expect("info");
    assert_eq!(info.vector_count, chunks.len());

    // nearest neighbors for a query sharing vocabulary with the lora chunks
    let embedder = FakeEmbedder::new(DIM);
    let query = embedder.embed("lora adaptation").await.expect("embed");
    let hits = store.search(&query, 3, 0.0, None).await.expect("search");
    assert!(!hits.is_empty());
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score, "sorted by similarity");
    }
    assert!(
        hits[0].chunk.content.contains("lora"),
        "overlapping vocabulary ranks first, got: {}",
        hits[0].chunk.content
    );
    assert_eq!(
        hits[0].chunk.metadata.get("lang"),
        Some(&serde_json::json!("en")),
        "metadata survives the round trip"
    );

    // payload filter narrows to one source file
    let filter = PayloadFilter::new().eq("source_file", "notes.txt");
    let hits = store.search(&query, 3, 0.0, Some(&filter)).await.expect("search");
    assert!(hits.iter().all(|h| h.chunk.source_file == "notes.txt"));

    // scroll returns full payload for snapshot loading
    let scrolled = store.scroll(100).await.expect("scroll");
    assert_eq!(scrolled.len(), chunks.len());
    assert!(scrolled.iter().all(|c| !c.content.is_empty()));

    // deleting a source file cascades to its chunks
    store
        .delete_by_filter(&PayloadFilter::new().eq("source_file", "guide.txt"))
        .await
        .expect("delete");
    let info = store.collection_info().await.expect("info");
    assert_eq!(info.vector_count, 1);
    let remaining = store.scroll(100).await.expect("scroll");
    assert_eq!(remaining[0].source_file, "notes.txt");
}

#[tokio::test]
async fn upsert_by_id_replaces_existing_rows() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (store, _) = seeded_store(tmp.path()).await;

    let embedder = FakeEmbedder::new(DIM);
    let updated = chunk("guide:0", "completely rewritten text", "guide.txt", 0);
    let vector = embedder.embed(&updated.content).await.expect("embed");
    store.upsert(&[updated], &[vector]).await.expect("upsert");

    let info = store.collection_info().await.expect("info");
    assert_eq!(info.vector_count, 3, "merge-insert did not duplicate the id");

    let scrolled = store.scroll(100).await.expect("scroll");
    let guide0 = scrolled
        .iter()
        .find(|c| c.id == "guide:0")
        .expect("guide:0 present");
    assert_eq!(guide0.content, "completely rewritten text");
}

#[tokio::test]
async fn metadata_filter_applies_after_scan() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (store, _) = seeded_store(tmp.path()).await;

    let embedder = FakeEmbedder::new(DIM);
    let query = embedder.embed("lora").await.expect("embed");

    let matching = PayloadFilter::new().eq("lang", "en");
    let hits = store.search(&query, 3, 0.0, Some(&matching)).await.expect("search");
    assert!(!hits.is_empty(), "metadata equality keeps matching rows");

    let mismatching = PayloadFilter::new().eq("lang", "de");
    let hits = store
        .search(&query, 3, 0.0, Some(&mismatching))
        .await
        .expect("search");
    assert!(hits.is_empty(), "metadata mismatch drops every row");
}

use std::{env, path::PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ragdb_core::chunker::Chunker;
use ragdb_core::config::AppConfig;
use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_embed::create_embedder;
use ragdb_vector::LanceVectorIndex;

const EMBED_BATCH: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;

    let args: Vec<String> = env::args().skip(1).collect();
    let data_dir = match args.iter().find(|a| !a.starts_with('-')) {
        Some(dir) => PathBuf::from(dir),
        None => {
            eprintln!("Usage: ragdb-indexer <data_dir>");
            std::process::exit(1);
        }
    };

    println!("RAGDB Indexer\n=============");
    println!("Data directory: {}", data_dir.display());
    println!("Database: {} (table: {})", config.storage.db_dir, config.storage.table);

    let chunks = Chunker::new().process_directory(&data_dir)?;
    if chunks.is_empty() {
        println!("Nothing to index.");
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)?;
    println!("Embedding backend: {}", embedder.id());
    let store = LanceVectorIndex::open(
        &config.storage.db_dir,
        &config.storage.table,
        config.embedding.dim,
    )
    .await?;

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?
            .progress_chars("#>-"),
    );

    let mut stored = 0usize;
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        store.upsert(batch, &embeddings).await?;
        stored += batch.len();
        pb.set_position(stored as u64);
    }
    pb.finish_with_message("done");

    let info = store.collection_info().await?;
    println!("\nIndexed {stored} chunks ({} vectors total).", info.vector_count);
    println!("Search with: cargo run --bin ragdb-search -- '<query>' --mode hybrid");
    Ok(())
}

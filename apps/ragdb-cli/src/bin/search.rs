use std::env;
use std::sync::Arc;

use ragdb_core::config::AppConfig;
use ragdb_core::types::SearchResult;
use ragdb_embed::create_embedder;
use ragdb_hybrid::{HybridParams, HybridRetriever};
use ragdb_vector::LanceVectorIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut query = None;
    let mut mode = "hybrid".to_string();
    let mut top_k = None;
    let mut threshold = None;
    let mut semantic_weight = None;
    let mut keyword_weight = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" | "-m" => {
                if i + 1 < args.len() {
                    mode = args[i + 1].clone();
                    i += 1;
                }
            }
            "--top-k" | "-k" => {
                if i + 1 < args.len() {
                    top_k = args[i + 1].parse::<usize>().ok();
                    i += 1;
                }
            }
            "--threshold" | "-t" => {
                if i + 1 < args.len() {
                    threshold = args[i + 1].parse::<f32>().ok();
                    i += 1;
                }
            }
            "--semantic-weight" => {
                if i + 1 < args.len() {
                    semantic_weight = args[i + 1].parse::<f32>().ok();
                    i += 1;
                }
            }
            "--keyword-weight" => {
                if i + 1 < args.len() {
                    keyword_weight = args[i + 1].parse::<f32>().ok();
                    i += 1;
                }
            }
            _ if !args[i].starts_with('-') && query.is_none() => query = Some(args[i].clone()),
            _ => {}
        }
        i += 1;
    }
    let Some(query) = query else {
        eprintln!(
            "Usage: ragdb-search <query> [--mode semantic|keyword|hybrid] [--top-k N] [--threshold T] [--semantic-weight W] [--keyword-weight W]"
        );
        std::process::exit(1);
    };

    let config = AppConfig::load()?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let threshold = threshold.unwrap_or(config.retrieval.threshold);

    let embedder = create_embedder(&config.embedding)?;
    let store = Arc::new(
        LanceVectorIndex::open(
            &config.storage.db_dir,
            &config.storage.table,
            config.embedding.dim,
        )
        .await?,
    );
    let retriever = HybridRetriever::initialize(store, embedder, &config.retrieval).await?;

    let results = match mode.as_str() {
        "semantic" => retriever.semantic_search(&query, top_k, threshold, None).await?,
        "keyword" => retriever.keyword_search(&query, top_k, None).await?,
        "hybrid" => {
            let defaults = HybridParams::from_config(&config.retrieval);
            let params = HybridParams {
                top_k,
                threshold,
                semantic_weight: semantic_weight.unwrap_or(defaults.semantic_weight),
                keyword_weight: keyword_weight.unwrap_or(defaults.keyword_weight),
                ..defaults
            };
            retriever.hybrid_search(&query, &params).await?
        }
        other => {
            eprintln!("Unknown mode: {other}. Use semantic, keyword, or hybrid.");
            std::process::exit(1);
        }
    };

    println!("Found {} results for \"{query}\" ({mode})\n", results.len());
    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }
    Ok(())
}

fn print_result(rank: usize, result: &SearchResult) {
    println!(
        "{rank}. [{:.4}] {} #{} ({})",
        result.score, result.source_file, result.chunk_index, result.search_type
    );
    if let (Some(s), Some(k)) = (result.semantic_score, result.keyword_score) {
        println!("   semantic={s:.4} keyword={k:.4}");
    }
    let snippet: String = result.content.replace('\n', " ").chars().take(160).collect();
    println!("   {snippet}");
    println!("   id: {}\n", result.id);
}

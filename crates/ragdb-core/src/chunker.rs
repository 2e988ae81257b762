//! Paragraph-based document chunking for ingestion.
//!
//! Splits source files into bounded chunks with word overlap, producing
//! [`DocumentChunk`]s with contiguous per-file indices and stable ids of the
//! form `"{file_stem}:{chunk_index}"`.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{DocumentChunk, Metadata};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Soft cap on estimated tokens per chunk.
    pub max_tokens: usize,
    /// Fraction of the window repeated between adjacent oversized-paragraph
    /// chunks.
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_percent: 0.2,
        }
    }
}

#[derive(Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk every `.txt`/`.md` file under `data_dir`, sorted by path so ids
    /// are reproducible across runs.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        let files = list_text_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt or .md files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for file_path in &files {
            let content = read_file_content(file_path)?;
            let source_file = file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let chunks = self.chunk_text(&content, &source_file, file_path);
            all_chunks.extend(chunks);
        }
        tracing::info!(
            files = files.len(),
            chunks = all_chunks.len(),
            "processed directory"
        );
        Ok(all_chunks)
    }

    /// Split one document's text into chunks. Paragraphs below the token cap
    /// become single chunks; oversized paragraphs are windowed with overlap.
    pub fn chunk_text(&self, content: &str, source_file: &str, path: &Path) -> Vec<DocumentChunk> {
        let stem = Path::new(source_file)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source_file.to_string());

        let mut chunks = Vec::new();
        let mut chunk_index = 0usize;
        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if estimate_tokens(paragraph) <= self.config.max_tokens {
                chunks.push(self.make_chunk(&stem, source_file, path, paragraph, chunk_index));
                chunk_index += 1;
            } else {
                for window in self.split_with_overlap(paragraph) {
                    chunks.push(self.make_chunk(&stem, source_file, path, &window, chunk_index));
                    chunk_index += 1;
                }
            }
        }
        chunks
    }

    fn make_chunk(
        &self,
        stem: &str,
        source_file: &str,
        path: &Path,
        text: &str,
        chunk_index: usize,
    ) -> DocumentChunk {
        let mut metadata = Metadata::new();
        metadata.insert(
            "path".to_string(),
            serde_json::Value::String(path.to_string_lossy().to_string()),
        );
        DocumentChunk {
            id: format!("{stem}:{chunk_index}"),
            content: text.to_string(),
            source_file: source_file.to_string(),
            chunk_index,
            metadata,
            embedding: None,
        }
    }

    fn split_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        // ~0.75 words per token keeps windows under the token cap
        let words_per_chunk = ((self.config.max_tokens as f32) * 0.75).max(1.0) as usize;
        let overlap_words = (words_per_chunk as f32 * self.config.overlap_percent) as usize;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        chunks
    }
}

fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some("txt") | Some("md") => files.push(path.to_path_buf()),
            _ => {}
        }
    }
    files.sort();
    files
}

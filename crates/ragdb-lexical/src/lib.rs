//! Okapi BM25 scoring over a fixed corpus.
//!
//! The index is immutable: [`Bm25Index::build`] consumes a tokenized corpus
//! and returns a value that only answers queries. Rebuilds produce a fresh
//! index that callers swap in whole, so readers never observe a half-built
//! state. Documents are addressed by their position in the corpus passed to
//! `build`; callers keep their own id list aligned to that order.

use std::collections::HashMap;

pub const DEFAULT_K1: f32 = 1.5;
pub const DEFAULT_B: f32 = 0.75;
/// Floor for negative IDF values, as a fraction of the mean IDF.
const IDF_EPSILON: f32 = 0.25;

/// Lowercase whitespace tokenization, applied identically to documents and
/// queries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Term statistics for one corpus, frozen at build time.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    term_freqs: Vec<HashMap<String, u32>>,
    idf: HashMap<String, f32>,
    doc_len: Vec<f32>,
    avgdl: f32,
    k1: f32,
    b: f32,
}

impl Bm25Index {
    /// Build an index over tokenized documents. Returns `None` for an empty
    /// corpus; keyword search then degrades to always-empty.
    pub fn build(docs: &[Vec<String>]) -> Option<Self> {
        if docs.is_empty() {
            return None;
        }
        let n = docs.len();
        let mut term_freqs = Vec::with_capacity(n);
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();
        let mut doc_len = Vec::with_capacity(n);
        let mut total_len = 0usize;

        for tokens in docs {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            doc_len.push(tokens.len() as f32);
            total_len += tokens.len();
            term_freqs.push(freqs);
        }

        let avgdl = total_len as f32 / n as f32;
        let idf = compute_idf(&doc_freqs, n);

        Some(Self {
            term_freqs,
            idf,
            doc_len,
            avgdl,
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        })
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// One BM25 score per corpus document, in corpus order. Unknown query
    /// terms contribute nothing.
    pub fn scores(&self, query: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.len()];
        for term in query {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            for (doc, freqs) in self.term_freqs.iter().enumerate() {
                let Some(&tf) = freqs.get(term) else {
                    continue;
                };
                let tf = tf as f32;
                let norm = self.k1 * (1.0 - self.b + self.b * self.doc_len[doc] / self.avgdl);
                scores[doc] += idf * (tf * (self.k1 + 1.0)) / (tf + norm);
            }
        }
        scores
    }

    /// Top `k` documents by score, descending, as `(position, score)` pairs.
    /// Documents with score `<= 0` are not matches and are dropped.
    pub fn top_k(&self, query: &[String], k: usize) -> Vec<(usize, f32)> {
        let scores = self.scores(query);
        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked.retain(|(_, score)| *score > 0.0);
        ranked
    }
}

/// Okapi IDF with the epsilon floor: terms in more than half the corpus get
/// a negative raw IDF, which is replaced by a small positive fraction of the
/// mean so common terms still rank rather than penalize.
fn compute_idf(doc_freqs: &HashMap<String, u32>, n: usize) -> HashMap<String, f32> {
    let n = n as f32;
    let mut idf = HashMap::with_capacity(doc_freqs.len());
    let mut idf_sum = 0.0f32;
    let mut negative: Vec<String> = Vec::new();
    for (term, &df) in doc_freqs {
        let df = df as f32;
        let value = ((n - df + 0.5) / (df + 0.5)).ln();
        idf_sum += value;
        if value < 0.0 {
            negative.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }
    let avg_idf = idf_sum / idf.len() as f32;
    let eps = IDF_EPSILON * avg_idf;
    for term in negative {
        idf.insert(term, eps);
    }
    idf
}

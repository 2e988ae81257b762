//! Score fusion for hybrid retrieval.
//!
//! A pure function over two immutable result lists; no index handles, so the
//! whole reranking step is unit-testable in isolation.

use std::collections::HashMap;

use ragdb_core::types::{SearchResult, SearchType};

/// Combine semantic and keyword candidates into one ranking.
///
/// Semantic scores are already cosine similarities in [0, 1]. Keyword (BM25)
/// scores are unbounded, so they are rescaled by the maximum raw score in
/// this result set before blending. A document found by only one strategy
/// keeps the other side's score at 0.0: the fused set is the union of both
/// candidate sets, not their intersection.
///
/// The returned list is sorted by blended score descending. Ties keep
/// insertion order (semantic candidates first, then keyword-only ones);
/// beyond being deterministic, tie order is unspecified.
pub fn combine_and_rerank(
    semantic: Vec<SearchResult>,
    keyword: Vec<SearchResult>,
    semantic_weight: f32,
    keyword_weight: f32,
) -> Vec<SearchResult> {
    struct Entry {
        result: SearchResult,
        semantic_score: f32,
        keyword_score: f32,
    }

    let mut entries: Vec<Entry> = Vec::with_capacity(semantic.len() + keyword.len());
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for result in semantic {
        by_id.insert(result.id.clone(), entries.len());
        let semantic_score = result.score;
        entries.push(Entry {
            result,
            semantic_score,
            keyword_score: 0.0,
        });
    }

    if !keyword.is_empty() {
        let max_keyword = keyword
            .iter()
            .map(|r| r.score)
            .fold(f32::NEG_INFINITY, f32::max);
        for result in keyword {
            let normalized = if max_keyword > 0.0 {
                result.score / max_keyword
            } else {
                0.0
            };
            if let Some(&i) = by_id.get(&result.id) {
                entries[i].keyword_score = normalized;
            } else {
                by_id.insert(result.id.clone(), entries.len());
                entries.push(Entry {
                    result,
                    semantic_score: 0.0,
                    keyword_score: normalized,
                });
            }
        }
    }

    let mut fused: Vec<SearchResult> = entries
        .into_iter()
        .map(|entry| {
            let mut result = entry.result;
            result.score =
                semantic_weight * entry.semantic_score + keyword_weight * entry.keyword_score;
            result.search_type = SearchType::Hybrid;
            result.semantic_score = Some(entry.semantic_score);
            result.keyword_score = Some(entry.keyword_score);
            result
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, score: f32, search_type: SearchType) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            content: format!("content of {id}"),
            source_file: "doc.txt".to_string(),
            chunk_index: 0,
            metadata: Default::default(),
            score,
            search_type,
            semantic_score: None,
            keyword_score: None,
        }
    }

    fn semantic(id: &str, score: f32) -> SearchResult {
        result(id, score, SearchType::Semantic)
    }

    fn keyword(id: &str, score: f32) -> SearchResult {
        result(id, score, SearchType::Keyword)
    }

    #[test]
    fn blended_score_is_the_weighted_sum() {
        let fused = combine_and_rerank(
            vec![semantic("a", 0.9)],
            vec![keyword("a", 4.0), keyword("b", 2.0)],
            0.7,
            0.3,
        );
        let a = fused.iter().find(|r| r.id == "a").expect("a fused");
        // keyword normalized: 4.0 / 4.0 = 1.0
        assert!((a.score - (0.7 * 0.9 + 0.3 * 1.0)).abs() < 1e-6);
        assert_eq!(a.search_type, SearchType::Hybrid);
        assert_eq!(a.semantic_score, Some(0.9));
        assert_eq!(a.keyword_score, Some(1.0));
    }

    #[test]
    fn union_keeps_single_strategy_documents() {
        let fused = combine_and_rerank(
            vec![semantic("only-semantic", 0.8)],
            vec![keyword("only-keyword", 3.0)],
            0.7,
            0.3,
        );
        assert_eq!(fused.len(), 2);
        let s = fused.iter().find(|r| r.id == "only-semantic").expect("s");
        assert_eq!(s.keyword_score, Some(0.0));
        let k = fused.iter().find(|r| r.id == "only-keyword").expect("k");
        assert_eq!(k.semantic_score, Some(0.0));
    }

    #[test]
    fn max_normalized_keyword_score_is_one() {
        let fused = combine_and_rerank(
            vec![],
            vec![keyword("a", 7.0), keyword("b", 3.5), keyword("c", 0.7)],
            0.7,
            0.3,
        );
        let max = fused
            .iter()
            .filter_map(|r| r.keyword_score)
            .fold(f32::NEG_INFINITY, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        let b = fused.iter().find(|r| r.id == "b").expect("b");
        assert!((b.keyword_score.expect("score") - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_max_keyword_score_normalizes_to_zero() {
        let fused = combine_and_rerank(vec![semantic("a", 0.5)], vec![keyword("b", 0.0)], 0.7, 0.3);
        let b = fused.iter().find(|r| r.id == "b").expect("b");
        assert_eq!(b.keyword_score, Some(0.0), "no division by zero");
    }

    #[test]
    fn empty_keyword_set_contributes_nothing() {
        let fused = combine_and_rerank(vec![semantic("a", 0.9), semantic("b", 0.4)], vec![], 0.7, 0.3);
        assert_eq!(fused.len(), 2);
        for r in &fused {
            assert_eq!(r.keyword_score, Some(0.0));
        }
        assert_eq!(fused[0].id, "a");
    }

    #[test]
    fn semantic_only_weights_reproduce_semantic_order() {
        let fused = combine_and_rerank(
            vec![semantic("a", 0.9), semantic("b", 0.6), semantic("c", 0.3)],
            vec![keyword("c", 9.0), keyword("b", 1.0)],
            1.0,
            0.0,
        );
        let order: Vec<&str> = fused.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"], "keyword scores carry no weight");
    }

    #[test]
    fn keyword_only_weights_reproduce_keyword_order() {
        let fused = combine_and_rerank(
            vec![semantic("a", 0.99)],
            vec![keyword("b", 9.0), keyword("c", 3.0)],
            0.0,
            1.0,
        );
        let order: Vec<&str> = fused.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn fusion_is_deterministic() {
        let semantic_set = vec![semantic("a", 0.5), semantic("b", 0.5)];
        let keyword_set = vec![keyword("c", 2.0), keyword("d", 2.0)];
        let first = combine_and_rerank(semantic_set.clone(), keyword_set.clone(), 0.7, 0.3);
        let second = combine_and_rerank(semantic_set, keyword_set, 0.7, 0.3);
        let ids = |v: &[SearchResult]| v.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second), "equal scores keep insertion order");
    }
}

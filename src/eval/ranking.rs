//! Dot-product scoring and deterministic top-K selection over the item block.

use crate::embeddings::EmbeddingBlock;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// One ranked item with its predicted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: usize,
    pub score: f32,
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Score every item against `user`: one dot product per item row, indexed by item.
pub fn score_items(user: &[f32], items: &EmbeddingBlock<'_>) -> Vec<f32> {
    items.iter_rows().map(|row| dot(user, row)).collect()
}

/// Highest-scoring `k` items, best first.
///
/// Ordering is descending by `f32::total_cmp`, ties broken by ascending item
/// index, so identical scores always produce the same list. Items in `exclude`
/// are never ranked. Returns fewer than `k` entries when fewer items remain.
pub fn top_k(scores: &[f32], k: usize, exclude: Option<&HashSet<usize>>) -> Vec<ScoredItem> {
    if k == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<ScoredItem> = scores
        .iter()
        .enumerate()
        .filter(|(item, _)| exclude.map_or(true, |ex| !ex.contains(item)))
        .map(|(item, &score)| ScoredItem { item, score })
        .collect();

    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, rank_order);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(rank_order);
    candidates
}

/// Score the item block against one user embedding and keep the top `k`.
pub fn rank_items(
    user: &[f32],
    items: &EmbeddingBlock<'_>,
    k: usize,
    exclude: Option<&HashSet<usize>>,
) -> Vec<ScoredItem> {
    top_k(&score_items(user, items), k, exclude)
}

fn rank_order(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score.total_cmp(&a.score).then(a.item.cmp(&b.item))
}

//! Top-K metrics: Recall@K, NDCG@K, Revenue@K and Diversity@K.
//!
//! Every function truncates `recommended` to its first `k` entries. A `k` of 0
//! yields an empty top-K and therefore a zero score; nothing here returns an error.

use crate::eval::catalog::{ItemCategories, ItemPrices};
use std::collections::HashSet;

/// Recall at K: proportion of ground-truth items that appear in top-K.
/// Returns |top-K ∩ ground_truth| / |ground_truth|, or 0.0 when ground_truth is empty.
pub fn recall_at_k(recommended: &[usize], ground_truth: &HashSet<usize>, k: usize) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }
    let hits = top_k_hits(recommended, ground_truth, k).len();
    hits as f64 / ground_truth.len() as f64
}

/// NDCG at K with binary relevance and discount 1/log2(rank + 2) for 0-indexed rank.
///
/// The ideal DCG is fixed at 1.0 (one relevant item at rank 0) regardless of how
/// many ground-truth items exist, so scores above 1.0 are possible when several
/// relevant items are ranked.
pub fn ndcg_at_k(recommended: &[usize], ground_truth: &HashSet<usize>, k: usize) -> f64 {
    const IDEAL_DCG: f64 = 1.0;
    let dcg: f64 = recommended
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, item)| ground_truth.contains(*item))
        .map(|(rank, _)| 1.0 / ((rank + 2) as f64).log2())
        .sum();
    dcg / IDEAL_DCG
}

/// Revenue at K: summed price of items both in top-K and in ground_truth.
/// Each hit item counts once; unknown items are priced at 0.
pub fn revenue_at_k(
    recommended: &[usize],
    ground_truth: &HashSet<usize>,
    item_prices: &ItemPrices,
    k: usize,
) -> f64 {
    top_k_hits(recommended, ground_truth, k)
        .into_iter()
        .map(|item| item_prices.price_of(item))
        .sum()
}

/// Diversity at K: distinct categories in top-K over distinct categories in the table.
///
/// Items missing from the table count as
/// [`UNKNOWN_CATEGORY`](crate::eval::catalog::UNKNOWN_CATEGORY), which may be one more
/// category than the table holds; the ratio is clamped to 1.0.
/// Returns 0.0 for an empty top-K or an empty category table.
pub fn diversity_at_k(recommended: &[usize], item_categories: &ItemCategories, k: usize) -> f64 {
    let total = item_categories.distinct_categories();
    if total == 0 {
        return 0.0;
    }
    let seen: HashSet<&str> = recommended
        .iter()
        .take(k)
        .map(|&item| item_categories.category_of(item))
        .collect();
    if seen.is_empty() {
        return 0.0;
    }
    (seen.len() as f64 / total as f64).min(1.0)
}

/// Distinct items of the top-K that are in the ground truth.
fn top_k_hits(recommended: &[usize], ground_truth: &HashSet<usize>, k: usize) -> HashSet<usize> {
    recommended
        .iter()
        .take(k)
        .filter(|item| ground_truth.contains(*item))
        .copied()
        .collect()
}

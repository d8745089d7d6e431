//! Population-level evaluation: embeddings -> per-user top-K -> averaged metrics.

use crate::embeddings::{EmbeddingBlock, EmbeddingProvider, EmbeddingTable, ForwardMode};
use crate::error::{EvalError, Result};
use crate::eval::catalog::{Catalog, ItemCategories, ItemPrices};
use crate::eval::metrics::{diversity_at_k, ndcg_at_k, recall_at_k, revenue_at_k};
use crate::eval::ranking::rank_items;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Cutoff used when none is configured.
pub const DEFAULT_TOP_K: usize = 10;

/// User index -> held-out item set. Iterated in ascending user order.
pub type GroundTruth = BTreeMap<usize, HashSet<usize>>;

/// User index -> items already interacted with (excluded from ranking on request).
pub type SeenItems = BTreeMap<usize, HashSet<usize>>;

/// Shape metadata for the combined entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Users occupy rows `[0, num_users)`; items occupy the rest.
    pub num_users: usize,
}

/// Metrics for one evaluated user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMetrics {
    pub user: usize,
    pub recall: f64,
    pub ndcg: f64,
    /// Present only with a price table.
    pub revenue: Option<f64>,
    /// Present only with a category table.
    pub diversity: Option<f64>,
}

/// Aggregated report over the evaluated user population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub top_k: usize,
    /// Users that appeared in the ground truth.
    pub num_users: usize,
    pub avg_recall: f64,
    pub avg_ndcg: f64,
    pub avg_revenue: Option<f64>,
    pub total_revenue: Option<f64>,
    pub avg_diversity: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

impl MetricReport {
    /// `(avg_recall, avg_ndcg)`
    pub fn summary(&self) -> (f64, f64) {
        (self.avg_recall, self.avg_ndcg)
    }
}

/// Running sums for the per-user metrics. Accumulators over disjoint user
/// partitions can be merged in any order.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    users: usize,
    recall_sum: f64,
    ndcg_sum: f64,
    revenue_sum: f64,
    diversity_sum: f64,
}

impl MetricAccumulator {
    pub fn push(&mut self, metrics: &UserMetrics) {
        self.users += 1;
        self.recall_sum += metrics.recall;
        self.ndcg_sum += metrics.ndcg;
        self.revenue_sum += metrics.revenue.unwrap_or(0.0);
        self.diversity_sum += metrics.diversity.unwrap_or(0.0);
    }

    pub fn merge(&mut self, other: MetricAccumulator) {
        self.users += other.users;
        self.recall_sum += other.recall_sum;
        self.ndcg_sum += other.ndcg_sum;
        self.revenue_sum += other.revenue_sum;
        self.diversity_sum += other.diversity_sum;
    }

    pub fn users(&self) -> usize {
        self.users
    }

    /// Arithmetic means; every mean is 0.0 when no user was pushed.
    pub fn finish(&self, top_k: usize, with_revenue: bool, with_diversity: bool) -> MetricReport {
        let mean = |sum: f64| {
            if self.users == 0 {
                0.0
            } else {
                sum / self.users as f64
            }
        };
        MetricReport {
            top_k,
            num_users: self.users,
            avg_recall: mean(self.recall_sum),
            avg_ndcg: mean(self.ndcg_sum),
            avg_revenue: with_revenue.then(|| mean(self.revenue_sum)),
            total_revenue: with_revenue.then_some(self.revenue_sum),
            avg_diversity: with_diversity.then(|| mean(self.diversity_sum)),
            generated_at: Utc::now(),
        }
    }
}

/// Evaluation driver.
///
/// Embeddings are computed once per pass in [`ForwardMode::Inference`]; the
/// provider, ground truth and catalog are only read.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    top_k: usize,
    catalog: Option<&'a Catalog>,
    seen: Option<&'a SeenItems>,
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            catalog: None,
            seen: None,
        }
    }

    /// Also report Revenue@K and/or Diversity@K, for whichever tables `catalog` holds.
    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Never rank items a user has already seen.
    pub fn excluding_seen(mut self, seen: &'a SeenItems) -> Self {
        self.seen = Some(seen);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Compute embeddings from `provider` and evaluate every ground-truth user.
    pub fn evaluate<P>(
        &self,
        provider: &P,
        meta: &Metadata,
        ground_truth: &GroundTruth,
    ) -> Result<MetricReport>
    where
        P: EmbeddingProvider + ?Sized,
    {
        let table = provider.compute_embeddings(ForwardMode::Inference)?;
        log::info!(
            "Computed {} embeddings (dim {}) for evaluation",
            table.rows(),
            table.dim()
        );
        self.evaluate_table(&table, meta, ground_truth)
    }

    /// Evaluate against an already computed combined table.
    pub fn evaluate_table(
        &self,
        table: &EmbeddingTable,
        meta: &Metadata,
        ground_truth: &GroundTruth,
    ) -> Result<MetricReport> {
        let per_user = self.evaluate_table_per_user(table, meta, ground_truth)?;
        Ok(self.report(&per_user))
    }

    /// Evaluate against separately produced user and item blocks.
    pub fn evaluate_blocks(
        &self,
        users: EmbeddingBlock<'_>,
        items: EmbeddingBlock<'_>,
        ground_truth: &GroundTruth,
    ) -> Result<MetricReport> {
        let per_user = self.evaluate_per_user(users, items, ground_truth)?;
        Ok(self.report(&per_user))
    }

    /// Per-user breakdown over a combined table.
    pub fn evaluate_table_per_user(
        &self,
        table: &EmbeddingTable,
        meta: &Metadata,
        ground_truth: &GroundTruth,
    ) -> Result<Vec<UserMetrics>> {
        if ground_truth.is_empty() {
            log::warn!("No users with ground truth; reporting zero metrics");
            return Ok(Vec::new());
        }
        let (users, items) = table.split(meta.num_users)?;
        self.evaluate_per_user(users, items, ground_truth)
    }

    /// Per-user metrics in ascending user order.
    ///
    /// Shapes and user indices are validated for the whole population before
    /// any user is scored.
    pub fn evaluate_per_user(
        &self,
        users: EmbeddingBlock<'_>,
        items: EmbeddingBlock<'_>,
        ground_truth: &GroundTruth,
    ) -> Result<Vec<UserMetrics>> {
        validate(&users, &items, ground_truth)?;
        if ground_truth.is_empty() {
            log::warn!("No users with ground truth; reporting zero metrics");
            return Ok(Vec::new());
        }
        if self.top_k == 0 {
            log::warn!("top_k is 0; every metric will be zero");
        } else if items.rows() < self.top_k {
            log::warn!(
                "Only {} items available for top_k = {}; ranking all items",
                items.rows(),
                self.top_k
            );
        }

        let empty_truth = ground_truth.values().filter(|g| g.is_empty()).count();
        if empty_truth > 0 {
            log::warn!("{} users have an empty ground-truth set", empty_truth);
        }

        let mut out = Vec::with_capacity(ground_truth.len());
        for (n, (&user, truth)) in ground_truth.iter().enumerate() {
            // validated above
            let Some(user_emb) = users.row(user) else {
                return Err(EvalError::UserOutOfRange {
                    user,
                    num_users: users.rows(),
                });
            };
            let exclude = self.seen.and_then(|s| s.get(&user));
            let recommended: Vec<usize> = rank_items(user_emb, &items, self.top_k, exclude)
                .into_iter()
                .map(|s| s.item)
                .collect();
            out.push(self.score_user(user, &recommended, truth));

            if (n + 1) % 1000 == 0 {
                log::debug!("Evaluated {}/{} users", n + 1, ground_truth.len());
            }
        }
        Ok(out)
    }

    fn score_user(
        &self,
        user: usize,
        recommended: &[usize],
        truth: &HashSet<usize>,
    ) -> UserMetrics {
        let k = self.top_k;
        UserMetrics {
            user,
            recall: recall_at_k(recommended, truth, k),
            ndcg: ndcg_at_k(recommended, truth, k),
            revenue: self
                .prices()
                .map(|prices| revenue_at_k(recommended, truth, prices, k)),
            diversity: self
                .categories()
                .map(|cats| diversity_at_k(recommended, cats, k)),
        }
    }

    fn prices(&self) -> Option<&'a ItemPrices> {
        self.catalog.and_then(|c| c.prices.as_ref())
    }

    fn categories(&self) -> Option<&'a ItemCategories> {
        self.catalog.and_then(|c| c.categories.as_ref())
    }

    fn report(&self, per_user: &[UserMetrics]) -> MetricReport {
        let mut acc = MetricAccumulator::default();
        for m in per_user {
            acc.push(m);
        }
        let report = acc.finish(
            self.top_k,
            self.prices().is_some(),
            self.categories().is_some(),
        );
        log::info!(
            "Evaluated {} users: Recall@{} = {:.4}, NDCG@{} = {:.4}",
            report.num_users,
            report.top_k,
            report.avg_recall,
            report.top_k,
            report.avg_ndcg
        );
        report
    }
}

/// Mean Recall@K and NDCG@K over every ground-truth user, `(0.0, 0.0)` when there are none.
pub fn evaluate_model<P>(
    provider: &P,
    meta: &Metadata,
    ground_truth: &GroundTruth,
    top_k: usize,
) -> Result<(f64, f64)>
where
    P: EmbeddingProvider + ?Sized,
{
    Ok(Evaluator::new(top_k)
        .evaluate(provider, meta, ground_truth)?
        .summary())
}

fn validate(
    users: &EmbeddingBlock<'_>,
    items: &EmbeddingBlock<'_>,
    ground_truth: &GroundTruth,
) -> Result<()> {
    if !users.is_empty() && !items.is_empty() && users.dim() != items.dim() {
        return Err(EvalError::DimensionMismatch {
            expected: users.dim(),
            found: items.dim(),
            context: "item block".to_string(),
        });
    }
    // BTreeMap: the last key is the largest user index
    if let Some((&user, _)) = ground_truth.iter().next_back() {
        if user >= users.rows() {
            return Err(EvalError::UserOutOfRange {
                user,
                num_users: users.rows(),
            });
        }
    }
    Ok(())
}

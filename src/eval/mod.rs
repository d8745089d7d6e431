//! Ranking evaluation: top-K metrics, ranking, the population driver and recommendations.

pub mod catalog;
pub mod dataset;
pub mod evaluator;
pub mod metrics;
pub mod ranking;
pub mod recommend;

pub use catalog::{Catalog, ItemCategories, ItemPrices, UNKNOWN_CATEGORY};
pub use dataset::EvalDataset;
pub use evaluator::{
    evaluate_model, Evaluator, GroundTruth, MetricAccumulator, MetricReport, Metadata, SeenItems,
    UserMetrics, DEFAULT_TOP_K,
};
pub use metrics::{diversity_at_k, ndcg_at_k, recall_at_k, revenue_at_k};
pub use ranking::{rank_items, score_items, top_k, ScoredItem};
pub use recommend::{Explanation, RecommendationRow, Recommender};

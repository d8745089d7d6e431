//! Top-K recommendations for individual users or batches, plus explanations.

use crate::embeddings::{EmbeddingProvider, EmbeddingTable, ForwardMode};
use crate::error::{EvalError, Result};
use crate::eval::evaluator::{Metadata, SeenItems};
use crate::eval::ranking::{dot, rank_items, score_items, top_k, ScoredItem};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// One (user, item, rank) line of a full recommendation dump. Ranks start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecommendationRow {
    pub user: usize,
    pub item: usize,
    pub rank: usize,
    pub score: f32,
}

/// Why `item` was recommended to `user`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub user: usize,
    pub item: usize,
    /// Predicted score of `item` for `user`.
    pub score: f32,
    /// Nearest users (by embedding dot product) who interacted with `item`.
    pub similar_users: Vec<usize>,
    /// Nearest items to `item` that `user` interacted with.
    pub similar_items: Vec<usize>,
}

/// Serves recommendations from embeddings computed once at construction.
pub struct Recommender {
    table: EmbeddingTable,
    num_users: usize,
    seen: Option<SeenItems>,
}

impl Recommender {
    /// Run the provider once in inference mode and keep the resulting table.
    pub fn from_provider<P>(provider: &P, meta: &Metadata) -> Result<Self>
    where
        P: EmbeddingProvider + ?Sized,
    {
        let table = provider.compute_embeddings(ForwardMode::Inference)?;
        Self::new(table, meta)
    }

    pub fn new(table: EmbeddingTable, meta: &Metadata) -> Result<Self> {
        // fail on a bad boundary now rather than on first use
        table.split(meta.num_users)?;
        Ok(Self {
            table,
            num_users: meta.num_users,
            seen: None,
        })
    }

    /// Exclude each user's already seen items from their recommendations.
    pub fn excluding_seen(mut self, seen: SeenItems) -> Self {
        self.seen = Some(seen);
        self
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn num_items(&self) -> usize {
        self.table.rows() - self.num_users
    }

    /// Top `k` items for `user`, best first.
    pub fn recommend(&self, user: usize, k: usize) -> Result<Vec<ScoredItem>> {
        let (users, items) = self.table.split(self.num_users)?;
        let user_emb = users.row(user).ok_or(EvalError::UserOutOfRange {
            user,
            num_users: self.num_users,
        })?;
        let exclude = self.seen.as_ref().and_then(|s| s.get(&user));
        Ok(rank_items(user_emb, &items, k, exclude))
    }

    /// Recommendations for several users. Unknown users are skipped with a warning.
    pub fn recommend_batch(
        &self,
        users: &[usize],
        k: usize,
    ) -> Result<BTreeMap<usize, Vec<ScoredItem>>> {
        let mut out = BTreeMap::new();
        for &user in users {
            match self.recommend(user, k) {
                Ok(recs) => {
                    out.insert(user, recs);
                }
                Err(EvalError::UserOutOfRange { .. }) => {
                    log::warn!("User {} not found; skipping", user);
                }
                Err(e) => return Err(e),
            }
        }
        if out.is_empty() && !users.is_empty() {
            log::warn!("No valid users in batch of {}", users.len());
        }
        Ok(out)
    }

    /// Top `k` for every user, flattened to rows in ascending user order.
    pub fn recommend_all(&self, k: usize) -> Result<Vec<RecommendationRow>> {
        let mut rows = Vec::with_capacity(self.num_users * k.min(self.num_items()));
        for user in 0..self.num_users {
            for (idx, rec) in self.recommend(user, k)?.into_iter().enumerate() {
                rows.push(RecommendationRow {
                    user,
                    item: rec.item,
                    rank: idx + 1,
                    score: rec.score,
                });
            }
        }
        log::info!(
            "Generated {} recommendations for {} users",
            rows.len(),
            self.num_users
        );
        Ok(rows)
    }

    /// Explain `item` for `user` from interaction history.
    ///
    /// Takes the `3 * n` nearest users (excluding `user`) and keeps up to `n`
    /// who interacted with `item`; likewise the `3 * n` nearest items
    /// (excluding `item`) that `user` interacted with.
    pub fn explain(
        &self,
        user: usize,
        item: usize,
        n: usize,
        history: &SeenItems,
    ) -> Result<Explanation> {
        let (users, items) = self.table.split(self.num_users)?;
        let user_emb = users.row(user).ok_or(EvalError::UserOutOfRange {
            user,
            num_users: self.num_users,
        })?;
        let item_emb = items.row(item).ok_or(EvalError::ItemOutOfRange {
            item,
            num_items: self.num_items(),
        })?;

        let self_user: HashSet<usize> = [user].into_iter().collect();
        let similar_users: Vec<usize> = top_k(
            &score_items(user_emb, &users),
            n.saturating_mul(3),
            Some(&self_user),
        )
        .into_iter()
        .map(|s| s.item)
        .filter(|other| history.get(other).is_some_and(|h| h.contains(&item)))
        .take(n)
        .collect();

        let self_item: HashSet<usize> = [item].into_iter().collect();
        let purchased = history.get(&user);
        let similar_items: Vec<usize> = top_k(
            &score_items(item_emb, &items),
            n.saturating_mul(3),
            Some(&self_item),
        )
        .into_iter()
        .map(|s| s.item)
        .filter(|other| purchased.is_some_and(|h| h.contains(other)))
        .take(n)
        .collect();

        Ok(Explanation {
            user,
            item,
            score: dot(user_emb, item_emb),
            similar_users,
            similar_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::PrecomputedEmbeddings;

    fn recommender() -> Recommender {
        let table = EmbeddingTable::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![4.0, 1.0],
            vec![3.0, 2.0],
            vec![2.0, 3.0],
        ])
        .unwrap();
        let provider = PrecomputedEmbeddings::new(table);
        Recommender::from_provider(&provider, &Metadata { num_users: 2 }).unwrap()
    }

    fn items(recs: &[ScoredItem]) -> Vec<usize> {
        recs.iter().map(|s| s.item).collect()
    }

    fn history() -> SeenItems {
        let mut h = SeenItems::new();
        h.insert(0, [0, 2].into_iter().collect());
        h.insert(1, [1].into_iter().collect());
        h
    }

    #[test]
    fn test_recommend() {
        let r = recommender();
        assert_eq!(r.num_items(), 3);
        let recs = r.recommend(1, 2).unwrap();
        assert_eq!(items(&recs), vec![2, 1]);
        assert!((recs[0].score - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_recommend_unknown_user() {
        assert!(matches!(
            recommender().recommend(5, 2),
            Err(EvalError::UserOutOfRange { user: 5, num_users: 2 })
        ));
    }

    #[test]
    fn test_recommend_excluding_seen() {
        let mut seen = SeenItems::new();
        seen.insert(0, [0].into_iter().collect());
        let r = recommender().excluding_seen(seen);
        assert_eq!(items(&r.recommend(0, 2).unwrap()), vec![1, 2]);
        // other users unaffected
        assert_eq!(items(&r.recommend(1, 1).unwrap()), vec![2]);
    }

    #[test]
    fn test_recommend_batch_skips_unknown() {
        let out = recommender().recommend_batch(&[0, 9, 1], 1).unwrap();
        assert_eq!(out.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(items(&out[&0]), vec![0]);
    }

    #[test]
    fn test_recommend_all_rows() {
        let rows = recommender().recommend_all(2).unwrap();
        let triples: Vec<_> = rows.iter().map(|r| (r.user, r.item, r.rank)).collect();
        assert_eq!(triples, vec![(0, 0, 1), (0, 1, 2), (1, 2, 1), (1, 1, 2)]);
        assert!((rows[0].score - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_recommend_all_respects_seen() {
        let r = recommender().excluding_seen(history());
        let rows = r.recommend_all(3).unwrap();
        let user0: Vec<_> = rows.iter().filter(|r| r.user == 0).map(|r| r.item).collect();
        assert_eq!(user0, vec![1]);
        let user1: Vec<_> = rows.iter().filter(|r| r.user == 1).map(|r| r.item).collect();
        assert_eq!(user1, vec![2, 0]);
    }

    #[test]
    fn test_recommend_all_zero_k() {
        assert!(recommender().recommend_all(0).unwrap().is_empty());
    }

    #[test]
    fn test_explain() {
        let exp = recommender().explain(0, 1, 2, &history()).unwrap();
        assert_eq!(exp.user, 0);
        assert_eq!(exp.item, 1);
        assert!((exp.score - 3.0).abs() < 1e-6);
        // user 1 bought item 1
        assert_eq!(exp.similar_users, vec![1]);
        // item 1 is closest to item 0 (14) then item 2 (12); user 0 bought both
        assert_eq!(exp.similar_items, vec![0, 2]);
    }

    #[test]
    fn test_explain_truncates_and_filters() {
        let exp = recommender().explain(0, 1, 1, &history()).unwrap();
        assert_eq!(exp.similar_items, vec![0]);

        // user 1 never bought item 2; of its neighbours [1, 0] user 0 only bought 0
        let exp = recommender().explain(0, 2, 2, &history()).unwrap();
        assert!(exp.similar_users.is_empty());
        assert_eq!(exp.similar_items, vec![0]);
    }

    #[test]
    fn test_explain_never_lists_self() {
        let mut h = history();
        h.get_mut(&0).unwrap().insert(1);
        let exp = recommender().explain(0, 1, 5, &h).unwrap();
        assert!(!exp.similar_users.contains(&0));
        assert!(!exp.similar_items.contains(&1));
    }

    #[test]
    fn test_explain_unknown_ids() {
        let r = recommender();
        assert!(matches!(
            r.explain(4, 0, 1, &history()),
            Err(EvalError::UserOutOfRange { user: 4, .. })
        ));
        assert!(matches!(
            r.explain(0, 3, 1, &history()),
            Err(EvalError::ItemOutOfRange { item: 3, num_items: 3 })
        ));
    }

    #[test]
    fn test_new_rejects_bad_boundary() {
        let table = EmbeddingTable::from_rows(vec![vec![1.0]]).unwrap();
        assert!(Recommender::new(table, &Metadata { num_users: 3 }).is_err());
    }
}

//! JSON evaluation dataset consumed by the command-line tools.

use crate::embeddings::{load_embedding_file, EmbeddingTable};
use crate::error::{EvalError, Result};
use crate::eval::catalog::{Catalog, ItemCategories, ItemPrices};
use crate::eval::evaluator::{GroundTruth, Metadata, SeenItems};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Evaluation inputs exported by the training side.
///
/// Map keys are user or item indices (JSON object keys are strings, parsed as integers).
#[derive(Debug, Clone, Deserialize)]
pub struct EvalDataset {
    pub num_users: usize,
    /// Combined user + item table, users first. May instead come from a raw f32 file.
    #[serde(default)]
    pub embeddings: Option<Vec<Vec<f32>>>,
    pub ground_truth: BTreeMap<usize, Vec<usize>>,
    #[serde(default)]
    pub item_prices: Option<HashMap<usize, f64>>,
    #[serde(default)]
    pub item_categories: Option<HashMap<usize, String>>,
    #[serde(default)]
    pub seen_items: Option<BTreeMap<usize, Vec<usize>>>,
}

impl EvalDataset {
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: EvalDataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let dataset = Self::from_json(&json)?;
        log::info!(
            "Loaded dataset from {}: {} users, {} with ground truth",
            path.display(),
            dataset.num_users,
            dataset.ground_truth.len()
        );
        Ok(dataset)
    }

    fn validate(&self) -> Result<()> {
        if let Some(prices) = &self.item_prices {
            if let Some((item, price)) = prices.iter().find(|(_, p)| p.is_nan() || **p < 0.0) {
                return Err(EvalError::InvalidInput(format!(
                    "item {} has invalid price {}",
                    item, price
                )));
            }
        }
        Ok(())
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            num_users: self.num_users,
        }
    }

    /// Inline embedding table, if the dataset carries one.
    pub fn embedding_table(&self) -> Result<Option<EmbeddingTable>> {
        self.embeddings
            .clone()
            .map(EmbeddingTable::from_rows)
            .transpose()
    }

    /// Inline embeddings, else the raw f32 file at `fallback` (path, dim).
    pub fn resolve_embeddings(
        &self,
        fallback: Option<(&Path, usize)>,
    ) -> Result<EmbeddingTable> {
        if let Some(table) = self.embedding_table()? {
            return Ok(table);
        }
        match fallback {
            Some((path, dim)) => load_embedding_file(path, dim),
            None => Err(EvalError::InvalidInput(
                "dataset has no inline embeddings and no embedding file is configured".to_string(),
            )),
        }
    }

    pub fn ground_truth(&self) -> GroundTruth {
        self.ground_truth
            .iter()
            .map(|(&u, items)| (u, items.iter().copied().collect()))
            .collect()
    }

    pub fn seen_items(&self) -> Option<SeenItems> {
        self.seen_items.as_ref().map(|seen| {
            seen.iter()
                .map(|(&u, items)| (u, items.iter().copied().collect()))
                .collect()
        })
    }

    /// Catalog holding whichever lookup tables the dataset carries, None when it has neither.
    pub fn catalog(&self) -> Option<Catalog> {
        let catalog = Catalog {
            prices: self.item_prices.clone().map(ItemPrices::new),
            categories: self.item_categories.clone().map(ItemCategories::new),
        };
        (!catalog.is_empty()).then_some(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "num_users": 2,
        "embeddings": [[1.0, 0.0], [0.0, 1.0], [4.0, 1.0], [1.0, 4.0]],
        "ground_truth": {"0": [0], "1": [1, 0]},
        "item_prices": {"0": 12.5},
        "seen_items": {"1": [0]}
    }"#;

    #[test]
    fn test_parse_dataset() {
        let ds = EvalDataset::from_json(DATASET).unwrap();
        assert_eq!(ds.metadata(), Metadata { num_users: 2 });
        assert_eq!(ds.embedding_table().unwrap().unwrap().rows(), 4);
        let gt = ds.ground_truth();
        assert_eq!(gt.len(), 2);
        assert!(gt[&1].contains(&0));
        assert!(ds.seen_items().unwrap()[&1].contains(&0));
    }

    #[test]
    fn test_catalog_from_partial_tables() {
        let ds = EvalDataset::from_json(DATASET).unwrap();
        let catalog = ds.catalog().unwrap();
        assert_eq!(catalog.prices.as_ref().unwrap().price_of(0), 12.5);
        // no category table: diversity must not be reported as a measured zero
        assert!(catalog.categories.is_none());
    }

    #[test]
    fn test_minimal_dataset() {
        let ds = EvalDataset::from_json(r#"{"num_users": 0, "ground_truth": {}}"#).unwrap();
        assert!(ds.embedding_table().unwrap().is_none());
        assert!(ds.catalog().is_none());
        assert!(ds.seen_items().is_none());
        assert!(ds.ground_truth().is_empty());
    }

    #[test]
    fn test_ragged_embeddings_rejected() {
        let ds = EvalDataset::from_json(
            r#"{"num_users": 1, "embeddings": [[1.0, 2.0], [1.0]], "ground_truth": {}}"#,
        )
        .unwrap();
        assert!(matches!(
            ds.embedding_table(),
            Err(EvalError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let err = EvalDataset::from_json(
            r#"{"num_users": 0, "ground_truth": {}, "item_prices": {"3": -1.0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EvalDataset::from_json("{"),
            Err(EvalError::Json(_))
        ));
    }

    #[test]
    fn test_resolve_embeddings_fallback() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("emb.f32");
        let table = EmbeddingTable::from_rows(vec![vec![1.0, 2.0]; 3]).unwrap();
        std::fs::write(&path, crate::embeddings::embedding_blob(&table)).unwrap();

        let ds = EvalDataset::from_json(r#"{"num_users": 1, "ground_truth": {}}"#).unwrap();
        assert_eq!(ds.resolve_embeddings(Some((path.as_path(), 2))).unwrap(), table);
        assert!(matches!(
            ds.resolve_embeddings(None),
            Err(EvalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_embeddings_prefers_inline() {
        let ds = EvalDataset::from_json(DATASET).unwrap();
        let table = ds.resolve_embeddings(Some((Path::new("unused.f32"), 2))).unwrap();
        assert_eq!(table.rows(), 4);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, DATASET).unwrap();
        assert_eq!(EvalDataset::load(&path).unwrap().num_users, 2);
    }
}

//! Item price and category lookup tables.
//!
//! Lookups never fail: absent items are priced at 0 and fall into the
//! [`UNKNOWN_CATEGORY`] bucket.

use std::collections::{HashMap, HashSet};

/// Category label assigned to items missing from the category table.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Item index -> non-negative price.
#[derive(Debug, Clone, Default)]
pub struct ItemPrices {
    prices: HashMap<usize, f64>,
}

impl ItemPrices {
    pub fn new(prices: HashMap<usize, f64>) -> Self {
        Self { prices }
    }

    /// Price of `item`, or 0.0 when unknown.
    pub fn price_of(&self, item: usize) -> f64 {
        self.prices.get(&item).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(usize, f64)> for ItemPrices {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Item index -> category label, with the number of distinct labels cached.
#[derive(Debug, Clone, Default)]
pub struct ItemCategories {
    categories: HashMap<usize, String>,
    distinct: usize,
}

impl ItemCategories {
    pub fn new(categories: HashMap<usize, String>) -> Self {
        let distinct = categories.values().collect::<HashSet<_>>().len();
        Self {
            categories,
            distinct,
        }
    }

    /// Category of `item`, or [`UNKNOWN_CATEGORY`] when absent.
    pub fn category_of(&self, item: usize) -> &str {
        self.categories
            .get(&item)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Number of distinct labels across the whole table.
    pub fn distinct_categories(&self) -> usize {
        self.distinct
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for ItemCategories {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(i, c)| (i, c.into())).collect())
    }
}

/// Auxiliary item data for the revenue and diversity metrics.
///
/// Revenue@K is reported only with a price table, Diversity@K only with a
/// category table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub prices: Option<ItemPrices>,
    pub categories: Option<ItemCategories>,
}

impl Catalog {
    pub fn new(prices: ItemPrices, categories: ItemCategories) -> Self {
        Self {
            prices: Some(prices),
            categories: Some(categories),
        }
    }

    pub fn with_prices(mut self, prices: ItemPrices) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn with_categories(mut self, categories: ItemCategories) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_none() && self.categories.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_default() {
        let prices: ItemPrices = [(1, 10.0), (2, 5.0)].into_iter().collect();
        assert_eq!(prices.price_of(1), 10.0);
        assert_eq!(prices.price_of(3), 0.0);
    }

    #[test]
    fn test_category_default() {
        let cats: ItemCategories = [(1, "A"), (2, "B")].into_iter().collect();
        assert_eq!(cats.category_of(2), "B");
        assert_eq!(cats.category_of(9), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_catalog_partial_tables() {
        let prices: ItemPrices = [(1, 2.0)].into_iter().collect();
        let catalog = Catalog::default().with_prices(prices);
        assert!(catalog.prices.is_some());
        assert!(catalog.categories.is_none());
        assert!(!catalog.is_empty());
        assert!(Catalog::default().is_empty());
    }

    #[test]
    fn test_distinct_categories() {
        let cats: ItemCategories = [(1, "A"), (2, "B"), (3, "A")].into_iter().collect();
        assert_eq!(cats.len(), 3);
        assert_eq!(cats.distinct_categories(), 2);
        assert_eq!(ItemCategories::default().distinct_categories(), 0);
    }
}

//! Embedding provider capability.
//!
//! The model that produces embeddings lives outside this crate. The evaluation
//! engine only sees it through [`EmbeddingProvider`], called once per pass.

use crate::embeddings::EmbeddingTable;
use crate::error::Result;

/// Forward-pass mode handed to the provider.
///
/// Evaluation and recommendation always request [`ForwardMode::Inference`];
/// a provider must not update parameters or track gradients in that mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    Train,
    Inference,
}

/// Computes all entity embeddings in one blocking call.
///
/// The returned table has shape `[num_users + num_items, dim]` with every user
/// row before every item row.
pub trait EmbeddingProvider {
    fn compute_embeddings(&self, mode: ForwardMode) -> Result<EmbeddingTable>;
}

/// Provider over an already materialised table (e.g. exported from training).
#[derive(Debug, Clone)]
pub struct PrecomputedEmbeddings {
    table: EmbeddingTable,
}

impl PrecomputedEmbeddings {
    pub fn new(table: EmbeddingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EmbeddingTable {
        &self.table
    }
}

impl EmbeddingProvider for PrecomputedEmbeddings {
    fn compute_embeddings(&self, _mode: ForwardMode) -> Result<EmbeddingTable> {
        Ok(self.table.clone())
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    fn compute_embeddings(&self, mode: ForwardMode) -> Result<EmbeddingTable> {
        (**self).compute_embeddings(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precomputed_returns_table() {
        let table = EmbeddingTable::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let provider = PrecomputedEmbeddings::new(table.clone());
        let out = provider.compute_embeddings(ForwardMode::Inference).unwrap();
        assert_eq!(out, table);
    }

    #[test]
    fn test_provider_by_reference() {
        fn rows_of(p: impl EmbeddingProvider) -> usize {
            p.compute_embeddings(ForwardMode::Inference).unwrap().rows()
        }
        let table = EmbeddingTable::from_rows(vec![vec![0.0]]).unwrap();
        let provider = PrecomputedEmbeddings::new(table);
        assert_eq!(rows_of(&provider), 1);
    }
}

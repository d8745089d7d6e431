//! Dense row-major embedding table over the combined user + item entity space.
//!
//! Users occupy rows `[0, num_users)`, items occupy the remainder.

use crate::error::{EvalError, Result};

/// Owned dense 2D table of shape `[rows, dim]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    data: Vec<f32>,
    dim: usize,
}

/// Borrowed view over a contiguous range of rows.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingBlock<'a> {
    data: &'a [f32],
    dim: usize,
}

impl EmbeddingTable {
    /// Build a table from a flat row-major buffer.
    ///
    /// `data.len()` must be a multiple of `dim`. A zero `dim` is only accepted
    /// for an empty buffer.
    pub fn from_flat(data: Vec<f32>, dim: usize) -> Result<Self> {
        if dim == 0 {
            if data.is_empty() {
                return Ok(Self::empty());
            }
            return Err(EvalError::MalformedEmbeddings(
                "embedding_dim is 0 but the buffer is not empty".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(EvalError::MalformedEmbeddings(format!(
                "buffer of {} floats is not a multiple of dimension {}",
                data.len(),
                dim
            )));
        }
        Ok(Self { data, dim })
    }

    /// Build a table from per-entity rows. All rows must share the first row's length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = match rows.first() {
            Some(r) => r.len(),
            None => return Ok(Self::empty()),
        };
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(EvalError::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                    context: format!("embedding row {}", idx),
                });
            }
            data.extend(row);
        }
        Self::from_flat(data, dim)
    }

    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            dim: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of entity rows.
    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    pub fn as_block(&self) -> EmbeddingBlock<'_> {
        EmbeddingBlock {
            data: &self.data,
            dim: self.dim,
        }
    }

    /// Split into (user block, item block) at `num_users`.
    pub fn split(&self, num_users: usize) -> Result<(EmbeddingBlock<'_>, EmbeddingBlock<'_>)> {
        let rows = self.rows();
        if num_users > rows {
            return Err(EvalError::MalformedEmbeddings(format!(
                "num_users = {} exceeds the {} rows of the embedding table",
                num_users, rows
            )));
        }
        let (users, items) = self.data.split_at(num_users * self.dim);
        Ok((
            EmbeddingBlock {
                data: users,
                dim: self.dim,
            },
            EmbeddingBlock {
                data: items,
                dim: self.dim,
            },
        ))
    }
}

impl<'a> EmbeddingBlock<'a> {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Row `idx`, or None past the end.
    pub fn row(&self, idx: usize) -> Option<&'a [f32]> {
        if idx >= self.rows() {
            return None;
        }
        let data: &'a [f32] = self.data;
        let start = idx * self.dim;
        Some(&data[start..start + self.dim])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f32]> + 'a {
        // chunks_exact panics on a zero chunk size
        let dim = self.dim.max(1);
        let data = if self.dim == 0 { &[][..] } else { self.data };
        data.chunks_exact(dim)
    }
}

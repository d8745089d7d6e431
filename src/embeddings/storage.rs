use crate::embeddings::EmbeddingTable;
use crate::error::{EvalError, Result};
use std::path::Path;

/// Parse an embedding BLOB into a table
///
/// # Arguments
///
/// * `blob` - BLOB bytes (little-endian f32 array, row-major)
/// * `dim` - Embedding dimension (floats per row)
///
/// # Returns
///
/// The table, or `MalformedEmbeddings` if the byte length does not fit `dim`
pub fn parse_embedding_blob(blob: &[u8], dim: usize) -> Result<EmbeddingTable> {
    if blob.len() % 4 != 0 {
        return Err(EvalError::MalformedEmbeddings(format!(
            "blob length {} is not a multiple of 4 bytes",
            blob.len()
        )));
    }

    let floats: Vec<f32> = blob
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect();

    EmbeddingTable::from_flat(floats, dim)
}

/// Serialize a table to the little-endian f32 layout read by [`parse_embedding_blob`]
pub fn embedding_blob(table: &EmbeddingTable) -> Vec<u8> {
    table
        .as_block()
        .iter_rows()
        .flat_map(|row| row.iter().flat_map(|f| f.to_le_bytes()))
        .collect()
}

/// Load an embedding table from a raw little-endian f32 file
pub fn load_embedding_file(path: &Path, dim: usize) -> Result<EmbeddingTable> {
    let blob = std::fs::read(path)?;
    let table = parse_embedding_blob(&blob, dim)?;
    log::info!(
        "Loaded {} embeddings (dim {}) from {}",
        table.rows(),
        table.dim(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embedding_valid() {
        let test_floats = vec![1.0f32, 2.0, 3.0, 4.0];
        let blob: Vec<u8> = test_floats.iter().flat_map(|f| f.to_le_bytes()).collect();

        let table = parse_embedding_blob(&blob, 2).unwrap();
        assert_eq!(table.rows(), 2);
        let block = table.as_block();
        assert_eq!(block.row(1), Some(&[3.0f32, 4.0][..]));
    }

    #[test]
    fn test_parse_embedding_invalid_length() {
        // 5 bytes
        let blob = vec![0u8, 1, 2, 3, 4];
        assert!(matches!(
            parse_embedding_blob(&blob, 1),
            Err(EvalError::MalformedEmbeddings(_))
        ));
    }

    #[test]
    fn test_parse_embedding_rows_do_not_fit_dim() {
        let blob: Vec<u8> = [1.0f32, 2.0, 3.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        assert!(parse_embedding_blob(&blob, 2).is_err());
    }

    #[test]
    fn test_parse_embedding_empty() {
        let table = parse_embedding_blob(&[], 64).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_embedding_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("emb.f32");
        let table = EmbeddingTable::from_rows(vec![vec![0.25, -1.5, 3.0]; 4]).unwrap();
        std::fs::write(&path, embedding_blob(&table)).unwrap();

        let loaded = load_embedding_file(&path, 3).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_load_embedding_file_missing() {
        let err = load_embedding_file(Path::new("does/not/exist.f32"), 3).unwrap_err();
        assert!(matches!(err, EvalError::Io(_)));
    }
}

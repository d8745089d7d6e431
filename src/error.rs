use thiserror::Error;

/// Main error type for receval
#[derive(Error, Debug)]
pub enum EvalError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset or report (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding rows or blocks disagree on dimension
    #[error("Embedding dimension mismatch in {context}: expected {expected}, got {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        context: String,
    },

    /// User index outside the user block of the embedding table
    #[error("User {user} out of range (num_users = {num_users})")]
    UserOutOfRange { user: usize, num_users: usize },

    /// Item index outside the item block of the embedding table
    #[error("Item {item} out of range (num_items = {num_items})")]
    ItemOutOfRange { item: usize, num_items: usize },

    /// Embedding table shape does not fit the metadata
    #[error("Malformed embeddings: {0}")]
    MalformedEmbeddings(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using EvalError
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = EvalError::DimensionMismatch {
            expected: 4,
            found: 3,
            context: "item block".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("item block"));
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("got 3"));
    }

    #[test]
    fn test_item_out_of_range_display() {
        let err = EvalError::ItemOutOfRange {
            item: 7,
            num_items: 3,
        };
        assert_eq!(err.to_string(), "Item 7 out of range (num_items = 3)");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EvalError = io_err.into();
        assert!(matches!(err, EvalError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: EvalError = json_err.into();
        assert!(matches!(err, EvalError::Json(_)));
    }
}

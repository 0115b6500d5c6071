//! Error types for Bookshelf.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Duplicate(_) | Self::NotFound(_) | Self::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::Duplicate("x".into()).is_client_error());
        assert!(Error::NotFound("x".into()).is_client_error());
        assert!(Error::Validation("x".into()).is_client_error());
        assert!(!Error::Database("x".into()).is_client_error());
    }

    #[test]
    fn test_display() {
        let e = Error::NotFound("book 7".into());
        assert_eq!(e.to_string(), "Not found: book 7");
    }
}

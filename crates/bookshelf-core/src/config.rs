//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Characters per page when `BOOKSHELF_PAGE_SIZE` is unset.
pub const DEFAULT_PAGE_SIZE: usize = 1500;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3003;

/// Paths to all Bookshelf data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database file (`data/books.db`).
    pub database: PathBuf,
    /// Uploaded book files (`data/uploads/`).
    pub uploads: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            database: root.join("books.db"),
            uploads: root.join("uploads"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.uploads)?;
        Ok(())
    }
}

/// Top-level Bookshelf configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookshelfConfig {
    /// HTTP server port.
    pub port: u16,
    /// Characters per page for reading.
    pub page_size: usize,
    /// Data directory paths.
    pub data_paths: DataPaths,
}

impl BookshelfConfig {
    /// Create configuration from environment and defaults.
    ///
    /// Reads `PORT` and `BOOKSHELF_PAGE_SIZE`.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_values(
            data_dir,
            std::env::var("PORT").ok().as_deref(),
            std::env::var("BOOKSHELF_PAGE_SIZE").ok().as_deref(),
        )
    }

    /// Build configuration from raw (possibly absent) setting values.
    pub fn from_values(
        data_dir: impl AsRef<Path>,
        port: Option<&str>,
        page_size: Option<&str>,
    ) -> Result<Self> {
        let port = match port {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: {:?}", p)))?,
            None => DEFAULT_PORT,
        };

        let page_size = match page_size {
            Some(s) => match s.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "BOOKSHELF_PAGE_SIZE must be a positive integer, got {:?}",
                        s
                    )))
                }
            },
            None => DEFAULT_PAGE_SIZE,
        };

        let data_paths = DataPaths::new(data_dir)?;
        debug!(port, page_size, root = %data_paths.root.display(), "configuration loaded");

        Ok(Self {
            port,
            page_size,
            data_paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BookshelfConfig::from_values(dir.path(), None, None).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.data_paths.database, dir.path().join("books.db"));
        assert!(config.data_paths.uploads.is_dir());
    }

    #[test]
    fn test_explicit_values() {
        let dir = TempDir::new().unwrap();
        let config = BookshelfConfig::from_values(dir.path(), Some("8080"), Some("2000")).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.page_size, 2000);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let dir = TempDir::new().unwrap();
        let result = BookshelfConfig::from_values(dir.path(), None, Some("0"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_bad_port() {
        let dir = TempDir::new().unwrap();
        let result = BookshelfConfig::from_values(dir.path(), Some("http"), None);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

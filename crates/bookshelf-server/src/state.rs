//! Shared application state.

use bookshelf_core::BookshelfConfig;
use bookshelf_store::SqliteStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: BookshelfConfig,
    pub store: SqliteStore,
}

impl AppState {
    pub fn new(config: BookshelfConfig, store: SqliteStore) -> Self {
        Self { config, store }
    }

    /// Page size from the request, or the configured default.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.page_size)
    }
}

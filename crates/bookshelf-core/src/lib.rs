//! Bookshelf Core: error taxonomy, configuration, shared helpers.

pub mod config;
pub mod error;

pub use config::{BookshelfConfig, DataPaths, DEFAULT_PAGE_SIZE};
pub use error::{Error, Result};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

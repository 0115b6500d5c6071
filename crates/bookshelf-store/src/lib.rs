//! Bookshelf Store: SQLite-backed books, paginated reading, progress and reading lists.

pub mod pagination;
pub mod reading_list;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use pagination::PageBounds;
pub use sqlite::SqliteStore;
pub use types::*;

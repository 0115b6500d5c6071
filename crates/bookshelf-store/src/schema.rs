//! Database schema SQL.

/// Books, per-user reading progress and reading lists.
///
/// `*_folded` columns hold Unicode-lowercased copies used for case-insensitive
/// search, since SQLite's `LIKE` only folds ASCII.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    genre TEXT NOT NULL DEFAULT '',
    content TEXT,
    source_file TEXT,
    content_hash TEXT,
    title_folded TEXT NOT NULL,
    author_folded TEXT NOT NULL,
    genre_folded TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_books_title_author ON books(title, author);
CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
CREATE INDEX IF NOT EXISTS idx_books_genre_folded ON books(genre_folded);

CREATE TABLE IF NOT EXISTS reading_progress (
    user_id INTEGER NOT NULL,
    book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    page INTEGER NOT NULL CHECK(page >= 1),
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, book_id)
);

CREATE INDEX IF NOT EXISTS idx_progress_book ON reading_progress(book_id);

CREATE TABLE IF NOT EXISTS reading_list (
    user_id INTEGER NOT NULL,
    book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'reading',
    rating INTEGER CHECK(rating >= 1 AND rating <= 5),
    added_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, book_id)
);

CREATE INDEX IF NOT EXISTS idx_reading_list_book ON reading_list(book_id);
"#;

/// Tables a valid Bookshelf database must contain.
pub const REQUIRED_TABLES: &[&str] = &["books", "reading_progress", "reading_list"];

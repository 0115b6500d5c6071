//! SQLite-backed book store with paginated reading and per-user progress.
//!
//! One connection guarded by a mutex; every public operation takes the lock,
//! runs a single statement (or one transaction) and releases it.

use std::os::raw::c_int;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::pagination::PageBounds;
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use bookshelf_core::{now_millis, Error, Result};

const SUMMARY_COLUMNS: &str = "id, title, author, genre, content IS NOT NULL AS has_content, \
     COALESCE(length(content), 0) AS content_chars, source_file, created_at";

/// SQLite store for books, reading progress and reading lists.
pub struct SqliteStore {
    pub(crate) conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the store at `db_path` (e.g., `data/books.db`).
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }

        let conn = Connection::open(&db_path).map_err(db_err)?;
        let store = Self::with_connection(conn, db_path)?;

        info!(
            "SqliteStore initialized: {} books, path={}",
            store.count_books()?,
            store.db_path.display()
        );
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ---------------------------------------------------------------
    // Books
    // ---------------------------------------------------------------

    /// Insert a metadata-only book. Returns the new book ID.
    pub fn add_book(&self, title: &str, author: &str, genre: &str) -> Result<i64> {
        self.insert_book(NewBook::new(title, author, genre))
    }

    /// Insert a book together with its full text. Returns the new book ID.
    pub fn add_book_with_content(
        &self,
        title: &str,
        author: &str,
        genre: &str,
        content: &str,
    ) -> Result<i64> {
        self.insert_book(NewBook::new(title, author, genre).with_content(content))
    }

    /// Insert a book. Fails with `Duplicate` when (title, author) already exists.
    pub fn insert_book(&self, book: NewBook) -> Result<i64> {
        let title = required("title", &book.title)?;
        let author = required("author", &book.author)?;
        let genre = book.genre.trim();
        if let Some(content) = &book.content {
            validate_content(content)?;
        }
        let hash = book.content.as_deref().map(content_hash);
        let now = now_millis();

        let conn = self.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO books (title, author, genre, content, source_file, content_hash, \
                 title_folded, author_folded, genre_folded, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .map_err(db_err)?
            .insert(params![
                title,
                author,
                genre,
                book.content,
                book.source_file,
                hash,
                fold(title),
                fold(author),
                fold(genre),
                now,
            ])
            .map_err(|e| match constraint_code(&e) {
                Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => duplicate_book(title, author),
                _ => db_err(e),
            })?;

        debug!(book_id = id, has_content = book.content.is_some(), "book added");
        Ok(id)
    }

    /// Get a book by ID, including its text.
    pub fn get_book(&self, book_id: i64) -> Result<Option<Book>> {
        let conn = self.lock();
        let book = conn
            .prepare_cached(
                "SELECT id, title, author, genre, content, source_file, content_hash, created_at, updated_at \
                 FROM books WHERE id = ?1",
            )
            .map_err(db_err)?
            .query_row(params![book_id], row_to_book)
            .optional()
            .map_err(db_err)?;
        Ok(book)
    }

    /// Get a book's text. `None` when the book is missing or has no text.
    pub fn get_book_content(&self, book_id: i64) -> Result<Option<String>> {
        let conn = self.lock();
        let content: Option<Option<String>> = conn
            .prepare_cached("SELECT content FROM books WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![book_id], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        Ok(content.flatten())
    }

    /// Get a book by ID without loading its text.
    pub fn get_book_summary(&self, book_id: i64) -> Result<Option<BookSummary>> {
        Ok(self
            .query_summaries("id = ?1", params![book_id])?
            .into_iter()
            .next())
    }

    /// Find a book whose stored text has the given hash.
    pub fn find_book_by_hash(&self, hash: &str) -> Result<Option<BookSummary>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT {} FROM books WHERE content_hash = ?1 ORDER BY id LIMIT 1",
            SUMMARY_COLUMNS
        );
        let found = conn
            .prepare_cached(&sql)
            .map_err(db_err)?
            .query_row(params![hash], row_to_summary)
            .optional()
            .map_err(db_err)?;
        Ok(found)
    }

    /// All books ordered by title.
    pub fn list_books(&self) -> Result<Vec<BookSummary>> {
        self.query_summaries("1 = 1", params![])
    }

    /// Books that have text and can be read.
    pub fn list_readable_books(&self) -> Result<Vec<BookSummary>> {
        self.query_summaries("content IS NOT NULL", params![])
    }

    /// Overwrite title, author and genre. Returns false when the book is missing.
    pub fn update_book_metadata(
        &self,
        book_id: i64,
        title: &str,
        author: &str,
        genre: &str,
    ) -> Result<bool> {
        let title = required("title", title)?;
        let author = required("author", author)?;
        let genre = genre.trim();

        let conn = self.lock();
        let count = conn
            .execute(
                "UPDATE books SET title = ?1, author = ?2, genre = ?3, \
                 title_folded = ?4, author_folded = ?5, genre_folded = ?6, updated_at = ?7 \
                 WHERE id = ?8",
                params![
                    title,
                    author,
                    genre,
                    fold(title),
                    fold(author),
                    fold(genre),
                    now_millis(),
                    book_id
                ],
            )
            .map_err(|e| match constraint_code(&e) {
                Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => duplicate_book(title, author),
                _ => db_err(e),
            })?;
        Ok(count > 0)
    }

    /// Replace a book's text. Returns false when the book is missing.
    pub fn set_book_content(&self, book_id: i64, content: &str) -> Result<bool> {
        validate_content(content)?;
        let conn = self.lock();
        let count = conn
            .execute(
                "UPDATE books SET content = ?1, content_hash = ?2, updated_at = ?3 WHERE id = ?4",
                params![content, content_hash(content), now_millis(), book_id],
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Delete a book along with its progress and reading-list rows (cascade).
    pub fn delete_book(&self, book_id: i64) -> Result<bool> {
        let conn = self.lock();
        let count = conn
            .execute("DELETE FROM books WHERE id = ?1", params![book_id])
            .map_err(db_err)?;
        if count > 0 {
            debug!(book_id, "book deleted");
        }
        Ok(count > 0)
    }

    /// Count all books.
    pub fn count_books(&self) -> Result<i64> {
        let conn = self.lock();
        conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------

    /// Case-insensitive search ordered by title.
    ///
    /// Without a field the query is a substring of title, author or genre.
    /// Title and author match substrings; genre must match exactly.
    pub fn search(&self, query: &str, field: Option<SearchField>) -> Result<Vec<BookSummary>> {
        let needle = fold(query);
        if needle.is_empty() {
            return Err(Error::Validation("search query is empty".into()));
        }
        let pattern = format!("%{}%", escape_like(&needle));

        match field {
            None => self.query_summaries(
                "title_folded LIKE ?1 ESCAPE '\\' OR author_folded LIKE ?1 ESCAPE '\\' \
                 OR genre_folded LIKE ?1 ESCAPE '\\'",
                params![pattern],
            ),
            Some(SearchField::Title) => {
                self.query_summaries(r"title_folded LIKE ?1 ESCAPE '\'", params![pattern])
            }
            Some(SearchField::Author) => {
                self.query_summaries(r"author_folded LIKE ?1 ESCAPE '\'", params![pattern])
            }
            Some(SearchField::Genre) => {
                self.query_summaries("genre_folded = ?1", params![needle])
            }
        }
    }

    fn query_summaries(
        &self,
        where_clause: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<BookSummary>> {
        let sql = format!(
            "SELECT {} FROM books WHERE {} ORDER BY title, id",
            SUMMARY_COLUMNS, where_clause
        );
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt.query_map(args, row_to_summary).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Pages
    // ---------------------------------------------------------------

    /// Compute one page of a book's text. Out-of-range pages saturate.
    ///
    /// `NotFound` when the book does not exist or has no text.
    pub fn get_page(&self, book_id: i64, page: i64, page_size: usize) -> Result<PageResult> {
        if page_size == 0 {
            return Err(Error::Validation("page size must be positive".into()));
        }

        let conn = self.lock();
        let row: Option<(String, Option<i64>)> = conn
            .prepare_cached("SELECT title, length(content) FROM books WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![book_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()
            .map_err(db_err)?;

        let (title, chars) = match row {
            None => return Err(Error::NotFound(format!("book {}", book_id))),
            Some((_, None)) | Some((_, Some(0))) => {
                return Err(Error::NotFound(format!("book {} has no text", book_id)))
            }
            Some((title, Some(chars))) => (title, chars as usize),
        };

        let bounds = PageBounds::compute(chars, page_size, page)?;

        // substr() counts characters and is 1-based.
        let text: String = conn
            .prepare_cached("SELECT substr(content, ?2, ?3) FROM books WHERE id = ?1")
            .map_err(db_err)?
            .query_row(
                params![book_id, bounds.start as i64 + 1, bounds.len() as i64],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        Ok(PageResult {
            book_id,
            title,
            page: bounds.page,
            total_pages: bounds.total_pages,
            page_size,
            start: bounds.start,
            end: bounds.end,
            percent: bounds.percent,
            text,
        })
    }

    /// Show a page to a user and remember it as their progress.
    ///
    /// Without an explicit page the user's saved page is used, else page 1.
    pub fn read_book(
        &self,
        user_id: i64,
        book_id: i64,
        page_size: usize,
        page: Option<i64>,
    ) -> Result<PageResult> {
        let requested = match page {
            Some(p) => p,
            None => self.get_progress(user_id, book_id)?.unwrap_or(1),
        };
        let result = self.get_page(book_id, requested, page_size)?;
        self.save_progress(user_id, book_id, result.page)?;
        Ok(result)
    }

    // ---------------------------------------------------------------
    // Reading progress
    // ---------------------------------------------------------------

    /// Upsert the last page a user viewed in a book. Last writer wins.
    ///
    /// `user_id` is the caller's own numeric user id; there is no users table.
    pub fn save_progress(&self, user_id: i64, book_id: i64, page: i64) -> Result<()> {
        if page < 1 {
            return Err(Error::Validation(format!("page must be >= 1, got {}", page)));
        }
        let conn = self.lock();
        conn.prepare_cached(
            "INSERT INTO reading_progress (user_id, book_id, page, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(user_id, book_id) DO UPDATE SET \
             page = excluded.page, updated_at = excluded.updated_at",
        )
        .map_err(db_err)?
        .execute(params![user_id, book_id, page, now_millis()])
        .map_err(|e| match constraint_code(&e) {
            Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::NotFound(format!("book {}", book_id))
            }
            _ => db_err(e),
        })?;
        debug!(user_id, book_id, page, "progress saved");
        Ok(())
    }

    /// Last saved page, or `None` when the user has not opened the book.
    pub fn get_progress(&self, user_id: i64, book_id: i64) -> Result<Option<i64>> {
        Ok(self
            .get_progress_record(user_id, book_id)?
            .map(|progress| progress.page))
    }

    /// Full progress row for (user, book).
    pub fn get_progress_record(
        &self,
        user_id: i64,
        book_id: i64,
    ) -> Result<Option<ReadingProgress>> {
        let conn = self.lock();
        let progress = conn
            .prepare_cached(
                "SELECT user_id, book_id, page, updated_at FROM reading_progress \
                 WHERE user_id = ?1 AND book_id = ?2",
            )
            .map_err(db_err)?
            .query_row(params![user_id, book_id], |row| {
                Ok(ReadingProgress {
                    user_id: row.get(0)?,
                    book_id: row.get(1)?,
                    page: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })
            .optional()
            .map_err(db_err)?;
        Ok(progress)
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Library-wide counts plus the three most common genres and authors.
    pub fn library_stats(&self) -> Result<LibraryStats> {
        let conn = self.lock();
        let (total_books, books_with_content): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(content) FROM books",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(db_err)?;

        let top = |column: &str| -> Result<Vec<NameCount>> {
            let sql = format!(
                "SELECT {col}, COUNT(*) AS n FROM books WHERE {col} != '' \
                 GROUP BY {col} ORDER BY n DESC, {col} ASC LIMIT 3",
                col = column
            );
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(NameCount {
                        name: row.get(0)?,
                        count: row.get(1)?,
                    })
                })
                .map_err(db_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
        };

        Ok(LibraryStats {
            total_books,
            books_with_content,
            top_genres: top("genre")?,
            top_authors: top("author")?,
        })
    }
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

/// Hex SHA-256 of a book's text.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub(crate) fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

/// Extended SQLite result code of a constraint violation.
pub(crate) fn constraint_code(e: &rusqlite::Error) -> Option<c_int> {
    match e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Some(failure.extended_code)
        }
        _ => None,
    }
}

fn duplicate_book(title: &str, author: &str) -> Error {
    Error::Duplicate(format!("book '{}' by {} already exists", title, author))
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

fn validate_content(content: &str) -> Result<()> {
    // SQLite's length() and substr() stop at the first NUL.
    if content.contains('\0') {
        return Err(Error::Validation("book text must not contain NUL characters".into()));
    }
    let chars = content.trim().chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(Error::Validation(format!(
            "book text must be at least {} characters, got {}",
            MIN_CONTENT_CHARS, chars
        )));
    }
    Ok(())
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Escape `LIKE` wildcards so they match literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        genre: row.get("genre")?,
        content: row.get("content")?,
        source_file: row.get("source_file")?,
        content_hash: row.get("content_hash")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookSummary> {
    Ok(BookSummary {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        genre: row.get("genre")?,
        has_content: row.get("has_content")?,
        content_chars: row.get("content_chars")?,
        source_file: row.get("source_file")?,
        created_at: row.get("created_at")?,
    })
}

//! Maintenance commands: validate an existing database, or reset it to a
//! small seed catalogue.

use std::path::Path;

use bookshelf_store::schema::REQUIRED_TABLES;
use bookshelf_store::{NewBook, SqliteStore};
use rusqlite::Connection;
use tracing::{error, info};

/// Catalogue entries created by `reset`.
const SEED_BOOKS: &[(&str, &str, &str)] = &[
    ("Властелин колец", "Толкин", "Фэнтези"),
    ("1984", "Оруэлл", "Антиутопия"),
    ("Преступление и наказание", "Фёдор Достоевский", "Классика"),
    ("Мастер и Маргарита", "Михаил Булгаков", "Классика"),
];

/// Result of a validate or reset run.
#[derive(Debug, Default)]
pub struct MaintenanceReport {
    pub db_valid: bool,
    pub books: i64,
    pub readable_books: i64,
    pub progress_rows: i64,
    pub reading_list_rows: i64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Check that `data_dir` holds a usable Bookshelf database.
pub fn validate(data_dir: &Path) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();

    let db_path = data_dir.join("books.db");
    if !db_path.exists() {
        report
            .errors
            .push(format!("Database not found: {}", db_path.display()));
        return report;
    }

    let conn = match Connection::open_with_flags(
        &db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    ) {
        Ok(c) => c,
        Err(e) => {
            report.errors.push(format!("Failed to open database: {}", e));
            return report;
        }
    };

    for table in REQUIRED_TABLES {
        match table_exists(&conn, table) {
            Ok(true) => {}
            Ok(false) => report
                .errors
                .push(format!("Missing required table: {}", table)),
            Err(e) => report
                .errors
                .push(format!("Error checking table {}: {}", table, e)),
        }
    }
    if !report.errors.is_empty() {
        return report;
    }

    let columns = get_column_names(&conn, "books");
    for col in ["id", "title", "author", "genre", "content", "title_folded"] {
        if !columns.iter().any(|c| c == col) {
            report.errors.push(format!("books table missing column: {}", col));
        }
    }
    if !report.errors.is_empty() {
        return report;
    }

    report.db_valid = true;
    report.books = count(&conn, "SELECT COUNT(*) FROM books").unwrap_or(0);
    report.readable_books = count(&conn, "SELECT COUNT(content) FROM books").unwrap_or(0);
    report.progress_rows = count(&conn, "SELECT COUNT(*) FROM reading_progress").unwrap_or(0);
    report.reading_list_rows = count(&conn, "SELECT COUNT(*) FROM reading_list").unwrap_or(0);

    if let Ok(orphans) = count(
        &conn,
        "SELECT COUNT(*) FROM reading_progress p \
         LEFT JOIN books b ON b.id = p.book_id WHERE b.id IS NULL",
    ) {
        if orphans > 0 {
            report
                .warnings
                .push(format!("{} progress rows point at missing books", orphans));
        }
    }
    if report.books == 0 {
        report.warnings.push("Library is empty".to_string());
    }

    report
}

/// Delete the database in `data_dir` and recreate it with seed books.
pub fn reset(data_dir: &Path) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();
    let db_path = data_dir.join("books.db");

    for suffix in ["", "-wal", "-shm"] {
        let path = data_dir.join(format!("books.db{}", suffix));
        if path.exists() {
            match std::fs::remove_file(&path) {
                Ok(()) => info!("Removed {}", path.display()),
                Err(e) => {
                    error!("Failed to remove {}: {}", path.display(), e);
                    report
                        .errors
                        .push(format!("Failed to remove {}: {}", path.display(), e));
                    return report;
                }
            }
        }
    }

    let store = match SqliteStore::open(&db_path) {
        Ok(s) => s,
        Err(e) => {
            report.errors.push(format!("Failed to create database: {}", e));
            return report;
        }
    };

    let test_book = NewBook::new("Test Book", "Test Author", "Test")
        .with_content("This is a test book for reading check. ".repeat(50));
    let seeds = SEED_BOOKS
        .iter()
        .map(|(title, author, genre)| NewBook::new(*title, *author, *genre))
        .chain(std::iter::once(test_book));

    for book in seeds {
        let title = book.title.clone();
        if let Err(e) = store.insert_book(book) {
            report.errors.push(format!("Failed to seed '{}': {}", title, e));
        }
    }
    drop(store);

    let validated = validate(data_dir);
    report.db_valid = validated.db_valid;
    report.books = validated.books;
    report.readable_books = validated.readable_books;
    report.errors.extend(validated.errors);
    info!(
        "Database reset: {} books, {} readable",
        report.books, report.readable_books
    );
    report
}

pub fn print_report(report: &MaintenanceReport) {
    println!("=== Bookshelf Database Report ===");
    println!();
    println!("Database valid:     {}", if report.db_valid { "YES" } else { "NO" });
    println!("Books:              {}", report.books);
    println!("Readable books:     {}", report.readable_books);
    println!("Progress rows:      {}", report.progress_rows);
    println!("Reading list rows:  {}", report.reading_list_rows);

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }
    if !report.errors.is_empty() {
        println!();
        println!("Errors:");
        for e in &report.errors {
            println!("  - {}", e);
        }
    }

    println!();
    if report.db_valid && report.errors.is_empty() {
        println!("Status: READY FOR USE");
    } else {
        println!("Status: FAILED");
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}

fn get_column_names(conn: &Connection, table: &str) -> Vec<String> {
    // Table names come from a fixed list, never from input.
    let query = format!("PRAGMA table_info({})", table);
    let mut names = Vec::new();
    if let Ok(mut stmt) = conn.prepare(&query) {
        if let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(1)) {
            names.extend(rows.flatten());
        }
    }
    names
}

fn count(conn: &Connection, sql: &str) -> Result<i64, rusqlite::Error> {
    conn.query_row(sql, [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_db() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate(dir.path());
        assert!(!report.db_valid);
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn test_validate_foreign_db() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("books.db")).unwrap();
        conn.execute_batch("CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT);")
            .unwrap();
        drop(conn);

        let report = validate(dir.path());
        assert!(!report.db_valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("reading_progress")));
    }

    #[test]
    fn test_validate_store_db() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteStore::open(dir.path().join("books.db")).unwrap();
            let id = store
                .add_book_with_content("T", "A", "G", "Some readable text.")
                .unwrap();
            store.save_progress(1, id, 1).unwrap();
        }

        let report = validate(dir.path());
        assert!(report.db_valid, "{:?}", report.errors);
        assert_eq!(report.books, 1);
        assert_eq!(report.readable_books, 1);
        assert_eq!(report.progress_rows, 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_reset_replaces_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteStore::open(dir.path().join("books.db")).unwrap();
            store.add_book("Old", "Book", "Gone").unwrap();
        }

        let report = reset(dir.path());
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(report.db_valid);
        assert_eq!(report.books, SEED_BOOKS.len() as i64 + 1);
        assert_eq!(report.readable_books, 1);

        let store = SqliteStore::open(dir.path().join("books.db")).unwrap();
        let found = store.search("old", None).unwrap();
        assert!(found.is_empty());
        let test_book = &store.search("test book", None).unwrap()[0];
        let page = store.get_page(test_book.id, 1, 1500).unwrap();
        assert_eq!(page.total_pages, 2);
    }
}

//! Record types for books, pages, progress and reading lists.

use std::fmt;
use std::str::FromStr;

use bookshelf_core::Error;
use serde::{Deserialize, Serialize};

/// Minimum number of characters a book's text must contain.
pub const MIN_CONTENT_CHARS: usize = 10;

/// A book row, including its full text when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Book {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// A book without its text, as returned by listings and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub has_content: bool,
    /// Length of the stored text in characters (0 when absent).
    pub content_chars: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub created_at: i64,
}

/// Input for inserting a book.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub content: Option<String>,
    pub source_file: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>, genre: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }
}

/// Field restriction for book search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Author,
    /// Exact (case-insensitive) genre match.
    Genre,
}

impl FromStr for SearchField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "genre" => Ok(Self::Genre),
            other => Err(Error::Validation(format!(
                "search field must be one of title, author, genre; got {:?}",
                other
            ))),
        }
    }
}

/// One page of a book's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub book_id: i64,
    pub title: String,
    /// 1-based page number after clamping.
    pub page: i64,
    pub total_pages: i64,
    pub page_size: usize,
    /// Character offset of the first character on the page.
    pub start: usize,
    /// Character offset one past the last character on the page.
    pub end: usize,
    /// Share of the book read once this page is finished, one decimal place.
    pub percent: f64,
    pub text: String,
}

/// Last page a user viewed in a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// The caller's own numeric user id (e.g. a chat account id); users are
    /// not registered in the store.
    pub user_id: i64,
    pub book_id: i64,
    pub page: i64,
    pub updated_at: i64,
}

/// Reading-list status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Planned,
    #[default]
    Reading,
    Completed,
    Dropped,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 4] = [
        ReadingStatus::Planned,
        ReadingStatus::Reading,
        ReadingStatus::Completed,
        ReadingStatus::Dropped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Reading => "reading",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "status must be one of planned, reading, completed, dropped; got {:?}",
                    s
                ))
            })
    }
}

/// A book on a user's reading list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingListEntry {
    /// External user id, as for [`ReadingProgress::user_id`].
    pub user_id: i64,
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub status: ReadingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub added_at: i64,
    pub updated_at: i64,
}

/// Per-user reading-list statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: i64,
    pub planned: i64,
    pub reading: i64,
    pub completed: i64,
    pub dropped: i64,
    pub rated: i64,
    /// Mean of given ratings, two decimal places; 0.0 when none.
    pub average_rating: f64,
}

/// A name with the number of books carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub count: i64,
}

/// Library-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_books: i64,
    pub books_with_content: i64,
    pub top_genres: Vec<NameCount>,
    pub top_authors: Vec<NameCount>,
}

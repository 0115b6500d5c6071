//! Parsing of `Title | Author | Genre` book descriptions.

use bookshelf_core::{Error, Result};
use bookshelf_store::NewBook;
use serde::{Deserialize, Serialize};

/// Bibliographic fields parsed from a caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMeta {
    pub title: String,
    pub author: String,
    pub genre: String,
}

impl BookMeta {
    pub fn into_new_book(self) -> NewBook {
        NewBook::new(self.title, self.author, self.genre)
    }
}

/// A caption together with the book's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub meta: BookMeta,
    pub content: String,
}

impl BookEntry {
    pub fn into_new_book(self) -> NewBook {
        self.meta.into_new_book().with_content(self.content)
    }
}

/// Parse `Title | Author | Genre`. Exactly three non-empty parts.
pub fn parse_caption(input: &str) -> Result<BookMeta> {
    let parts: Vec<&str> = input.split('|').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(Error::Validation(
            "expected format: Title | Author | Genre".into(),
        ));
    }
    meta_from_parts(parts[0], parts[1], parts[2])
}

/// Parse `Title | Author | Genre | Text`. The text may itself contain `|`.
pub fn parse_entry(input: &str) -> Result<BookEntry> {
    let parts: Vec<&str> = input.splitn(4, '|').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(Error::Validation(
            "expected format: Title | Author | Genre | Text".into(),
        ));
    }
    let meta = meta_from_parts(parts[0], parts[1], parts[2])?;
    Ok(BookEntry {
        meta,
        content: parts[3].to_string(),
    })
}

/// Parse a one-line book description: three parts add a catalogue entry,
/// four or more add a readable book whose text is everything after the genre.
pub fn parse_book_line(input: &str) -> Result<NewBook> {
    if input.matches('|').count() >= 3 {
        Ok(parse_entry(input)?.into_new_book())
    } else {
        Ok(parse_caption(input)?.into_new_book())
    }
}

fn meta_from_parts(title: &str, author: &str, genre: &str) -> Result<BookMeta> {
    for (name, value) in [("title", title), ("author", author), ("genre", genre)] {
        if value.is_empty() {
            return Err(Error::Validation(format!("{} must not be empty", name)));
        }
    }
    Ok(BookMeta {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
    })
}

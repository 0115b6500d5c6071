//! Bookshelf Ingest: uploaded file decoding and book caption parsing.

pub mod caption;
pub mod file;

pub use caption::{parse_book_line, parse_caption, parse_entry, BookEntry, BookMeta};
pub use file::{decode_text, extract_upload, normalize_text, FileType};

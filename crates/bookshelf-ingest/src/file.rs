//! Text extraction for uploaded book files.

use bookshelf_core::{Error, Result};
use chardetng::EncodingDetector;
use tracing::{debug, warn};

/// Supported upload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    PlainText,
    Markdown,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" => Self::PlainText,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name such as `war_and_peace.txt`.
    pub fn from_filename(name: &str) -> Self {
        std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Decode raw file bytes into text. Returns the text and the encoding name.
///
/// Byte-order marks win; valid UTF-8 is taken as is; anything else goes
/// through encoding detection (e.g. Windows-1251 Russian texts).
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return (String::from_utf8_lossy(rest).into_owned(), "UTF-8");
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let (decoded, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(rest);
        return (decoded.into_owned(), "UTF-16LE");
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let (decoded, _) = encoding_rs::UTF_16BE.decode_without_bom_handling(rest);
        return (decoded.into_owned(), "UTF-16BE");
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), "UTF-8");
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("decoding with {} replaced malformed bytes", encoding.name());
    }
    (decoded.into_owned(), encoding.name())
}

/// Unify line endings, drop NUL characters, strip trailing spaces, keep at
/// most two blank lines in a row.
pub fn normalize_text(content: &str) -> String {
    let unified = content
        .replace('\0', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut result = String::with_capacity(unified.len());
    let mut blank_run = 0;
    for line in unified.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        result.push_str(line);
        result.push('\n');
    }
    result.trim().to_string()
}

/// Turn an uploaded file into book text.
pub fn extract_upload(filename: &str, bytes: &[u8]) -> Result<String> {
    let file_type = FileType::from_filename(filename);
    if !file_type.is_supported() {
        return Err(Error::Validation(format!(
            "unsupported file type: {} (expected .txt or .md)",
            filename
        )));
    }
    let (text, encoding) = decode_text(bytes);
    debug!(filename, encoding, bytes = bytes.len(), "decoded upload");
    Ok(normalize_text(&text))
}

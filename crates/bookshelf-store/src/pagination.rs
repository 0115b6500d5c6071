//! Page arithmetic over character offsets.
//!
//! Pages are measured in characters (Unicode scalar values), never bytes, so a
//! page boundary cannot split a code point. Out-of-range page numbers saturate
//! into `[1, total_pages]` instead of failing.

use bookshelf_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Boundaries of one page within a text of known length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    /// 1-based page number after clamping.
    pub page: i64,
    pub total_pages: i64,
    /// First character offset on the page.
    pub start: usize,
    /// One past the last character offset on the page.
    pub end: usize,
    /// `end / len * 100`, rounded to one decimal place with ties to even.
    pub percent: f64,
}

impl PageBounds {
    /// Compute the bounds of `requested` for a text of `content_chars` characters.
    pub fn compute(content_chars: usize, page_size: usize, requested: i64) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::Validation("page size must be positive".into()));
        }
        if content_chars == 0 {
            return Err(Error::Validation("empty content cannot be paged".into()));
        }

        let total_pages = total_pages(content_chars, page_size);
        let page = requested.clamp(1, total_pages as i64);

        let start = (page as usize - 1) * page_size;
        let end = (start + page_size).min(content_chars);

        Ok(Self {
            page,
            total_pages: total_pages as i64,
            start,
            end,
            percent: percent_one_decimal(end, content_chars),
        })
    }

    /// Number of characters on the page.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_last(&self) -> bool {
        self.page == self.total_pages
    }
}

/// `ceil(content_chars / page_size)`, never less than 1.
pub fn total_pages(content_chars: usize, page_size: usize) -> usize {
    content_chars.div_ceil(page_size.max(1)).max(1)
}

/// `part / whole * 100` to one decimal place, ties to even, in exact integer
/// arithmetic.
fn percent_one_decimal(part: usize, whole: usize) -> f64 {
    let scaled = part as u128 * 1000;
    let whole = whole as u128;
    let mut tenths = scaled / whole;
    let twice_rem = (scaled % whole) * 2;
    if twice_rem > whole || (twice_rem == whole && tenths % 2 == 1) {
        tenths += 1;
    }
    tenths as f64 / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_page_example() {
        let last = PageBounds::compute(3700, 1500, 3).unwrap();
        assert_eq!(last.total_pages, 3);
        assert_eq!((last.start, last.end), (3000, 3700));
        assert_eq!(last.percent, 100.0);
        assert!(last.is_last());

        let first = PageBounds::compute(3700, 1500, 1).unwrap();
        assert_eq!((first.start, first.end), (0, 1500));
        assert_eq!(first.percent, 40.5);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_page() {
        let bounds = PageBounds::compute(3000, 1500, 99).unwrap();
        assert_eq!(bounds.total_pages, 2);
        assert_eq!(bounds.page, 2);
        assert_eq!((bounds.start, bounds.end), (1500, 3000));
    }

    #[test]
    fn test_clamps_low_and_high() {
        let low = PageBounds::compute(3700, 1500, 0).unwrap();
        assert_eq!(low.page, 1);
        let negative = PageBounds::compute(3700, 1500, -4).unwrap();
        assert_eq!(negative.page, 1);
        let high = PageBounds::compute(3700, 1500, 3 + 5).unwrap();
        assert_eq!(high.page, 3);
        let huge = PageBounds::compute(3700, 1500, i64::MAX).unwrap();
        assert_eq!(huge.page, 3);
    }

    #[test]
    fn test_percent_ties_round_to_even() {
        // 49/400 is exactly 12.25%, 51/400 exactly 12.75%.
        assert_eq!(PageBounds::compute(400, 49, 1).unwrap().percent, 12.2);
        assert_eq!(PageBounds::compute(400, 51, 1).unwrap().percent, 12.8);
        // 1/3 is not a tie.
        assert_eq!(PageBounds::compute(3, 1, 1).unwrap().percent, 33.3);
        assert_eq!(PageBounds::compute(3, 2, 1).unwrap().percent, 66.7);
    }

    #[test]
    fn test_short_text_is_single_page() {
        let bounds = PageBounds::compute(12, 1500, 1).unwrap();
        assert_eq!(bounds.total_pages, 1);
        assert_eq!((bounds.start, bounds.end), (0, 12));
        assert_eq!(bounds.percent, 100.0);
    }

    #[test]
    fn test_rejects_zero_page_size_and_empty_text() {
        assert!(matches!(
            PageBounds::compute(100, 0, 1),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            PageBounds::compute(0, 100, 1),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_bounds_always_in_range() {
        for len in 1..60usize {
            for size in 1..15usize {
                let total = total_pages(len, size) as i64;
                for requested in -2..total + 4 {
                    let b = PageBounds::compute(len, size, requested).unwrap();
                    assert!(b.start < b.end, "len={len} size={size} p={requested}");
                    assert!(b.end <= len);
                    assert!(b.page >= 1 && b.page <= b.total_pages);
                    assert!(b.len() <= size);
                    assert!(b.percent > 0.0 && b.percent <= 100.0);
                }
            }
        }
    }
}

//! Result paging and per-item summaries.

use std::fmt::Write as _;
use std::ops::Range;

use crate::search::{NOT_AVAILABLE, ResultItem, UNKNOWN_EXTENSION};

/// One page of a result list.
///
/// `page` is zero-based; display indices are one-based and absolute, so the
/// number shown next to an item is the number a user selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: usize,
    per_page: usize,
    total: usize,
}

impl PageWindow {
    /// Window over `total` results, `per_page` at a time. An out-of-range
    /// `page` is clamped to the last page.
    #[must_use]
    pub fn new(total: usize, per_page: usize, page: usize) -> Self {
        let per_page = per_page.max(1);
        let last = total_pages(total, per_page) - 1;
        Self {
            page: page.min(last),
            per_page,
            total,
        }
    }

    /// Zero-based page number.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of pages; at least 1.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.per_page)
    }

    /// Total result count.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Zero-based indices of the items on this page.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = (self.page * self.per_page).min(self.total);
        let end = (start + self.per_page).min(self.total);
        start..end
    }

    /// The page's slice of `items`.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }

    /// One-based display indices of the items on this page.
    pub fn display_indices(&self) -> impl Iterator<Item = usize> {
        self.range().map(|index| index + 1)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    /// Window for the following page (unchanged on the last page).
    #[must_use]
    pub fn next(&self) -> Self {
        Self::new(self.total, self.per_page, self.page + 1)
    }

    /// Window for the preceding page (unchanged on the first page).
    #[must_use]
    pub fn prev(&self) -> Self {
        Self::new(self.total, self.per_page, self.page.saturating_sub(1))
    }

    /// `"Showing results 6 - 10 of 12"`.
    #[must_use]
    pub fn describe(&self) -> String {
        let range = self.range();
        format!(
            "Showing results {} - {} of {}",
            (range.start + 1).min(self.total),
            range.end,
            self.total
        )
    }

    /// `"Page 2/3"`, or `None` when everything fits on one page.
    #[must_use]
    pub fn footer(&self) -> Option<String> {
        (self.total_pages() > 1).then(|| format!("Page {}/{}", self.page + 1, self.total_pages()))
    }
}

fn total_pages(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page).max(1)
}

/// Multi-line summary of `item` under its one-based `display_index`.
///
/// ```text
/// 3. Dune
/// Author(s): Frank Herbert (1965)
/// Format: epub | Size: 1 Mb | Lang: English
/// Publisher/Journal: Chilton Books
/// ```
#[must_use]
pub fn item_summary(display_index: usize, item: &ResultItem) -> String {
    let mut text = format!("{display_index}. {}\n", item.title());
    let _ = write!(text, "Author(s): {}", item.authors());
    if let Some(year) = item.year() {
        let _ = write!(text, " ({year})");
    }
    let extension = if item.extension() == UNKNOWN_EXTENSION {
        NOT_AVAILABLE
    } else {
        item.extension()
    };
    let _ = write!(
        text,
        "\nFormat: {extension} | Size: {} | Lang: {}",
        item.size(),
        item.language()
    );
    if let Some(publisher) = item.publisher_or_journal() {
        let _ = write!(text, "\nPublisher/Journal: {publisher}");
    }
    if let Some(doi) = item.doi() {
        let _ = write!(text, "\nDOI: {doi}");
    }
    text
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_twelve_results_make_three_pages() {
        let first = PageWindow::new(12, 5, 0);
        assert_eq!(first.total_pages(), 3);
        assert_eq!(first.range(), 0..5);
        assert!(first.has_next());
        assert!(!first.has_prev());
        assert_eq!(first.describe(), "Showing results 1 - 5 of 12");
        assert_eq!(first.footer().unwrap(), "Page 1/3");

        let last = first.next().next();
        assert_eq!(last.range(), 10..12);
        assert_eq!(last.display_indices().collect::<Vec<_>>(), vec![11, 12]);
        assert!(!last.has_next());
        assert_eq!(last.next(), last);
        assert_eq!(last.describe(), "Showing results 11 - 12 of 12");
    }

    #[test]
    fn test_single_page_has_no_footer_or_navigation() {
        let window = PageWindow::new(3, 5, 0);
        assert_eq!(window.total_pages(), 1);
        assert!(window.footer().is_none());
        assert!(!window.has_next() && !window.has_prev());
        assert_eq!(window.prev(), window);
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let window = PageWindow::new(7, 5, 9);
        assert_eq!(window.page(), 1);
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(window.slice(&items), &[5, 6]);
    }

    #[test]
    fn test_empty_result_list() {
        let window = PageWindow::new(0, 5, 0);
        assert_eq!(window.total_pages(), 1);
        assert_eq!(window.range(), 0..0);
        assert_eq!(window.describe(), "Showing results 0 - 0 of 0");
    }

    #[test]
    fn test_item_summary_includes_optional_fields_when_present() {
        let article = ResultItem::builder("Deep Results")
            .authors("A. Author")
            .year("2020")
            .extension("pdf")
            .publisher_or_journal("Journal of Things")
            .doi("10.1000/xyz")
            .primary_mirror(Some(Url::parse("https://m.example/a").unwrap()))
            .build()
            .unwrap();
        let text = item_summary(3, &article);
        assert!(text.starts_with("3. Deep Results\n"));
        assert!(text.contains("Author(s): A. Author (2020)"));
        assert!(text.contains("Format: pdf | Size: N/A | Lang: N/A"));
        assert!(text.contains("Publisher/Journal: Journal of Things"));
        assert!(text.contains("DOI: 10.1000/xyz"));

        let bare = ResultItem::builder("Bare")
            .primary_mirror(Some(Url::parse("https://m.example/b").unwrap()))
            .build()
            .unwrap();
        let text = item_summary(1, &bare);
        assert!(!text.contains("DOI"));
        assert!(!text.contains("Publisher"));
        assert!(text.contains("Format: N/A"));
    }
}

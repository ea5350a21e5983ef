//! Parsed search hits.

use serde::Serialize;
use url::Url;

use super::SearchCategory;

/// Placeholder for unknown text fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for an unknown extension (always lower case).
pub const UNKNOWN_EXTENSION: &str = "n/a";

/// One search hit. Immutable once built.
///
/// Always has a non-empty title and at least one of
/// [`primary_mirror_url`](Self::primary_mirror_url) /
/// [`secondary_mirror_url`](Self::secondary_mirror_url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    title: String,
    authors: String,
    series: Option<String>,
    publisher_or_journal: Option<String>,
    year: Option<String>,
    pages: Option<String>,
    language: String,
    size: String,
    extension: String,
    doi: Option<String>,
    primary_mirror_url: Option<Url>,
    secondary_mirror_url: Option<Url>,
    details_url: Option<Url>,
}

impl ResultItem {
    /// Starts building an item with `title`.
    #[must_use]
    pub fn builder(title: impl Into<String>) -> ResultItemBuilder {
        ResultItemBuilder::new(title)
    }

    /// Title without ISBN/ASIN suffixes.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authors, or `"N/A"`.
    #[must_use]
    pub fn authors(&self) -> &str {
        &self.authors
    }

    /// Series name.
    #[must_use]
    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    /// Publisher (books) or journal (articles).
    #[must_use]
    pub fn publisher_or_journal(&self) -> Option<&str> {
        self.publisher_or_journal.as_deref()
    }

    /// Publication year.
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// Page count.
    #[must_use]
    pub fn pages(&self) -> Option<&str> {
        self.pages.as_deref()
    }

    /// Language, or `"N/A"`.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Human-readable size, or `"N/A"`.
    #[must_use]
    pub fn size(&self) -> &str {
        &self.size
    }

    /// Lower-case extension, or `"n/a"`.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// DOI (articles only).
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    /// First mirror page, or the details page when no mirror was parsed.
    #[must_use]
    pub fn primary_mirror_url(&self) -> Option<&Url> {
        self.primary_mirror_url.as_ref()
    }

    /// Second mirror page.
    #[must_use]
    pub fn secondary_mirror_url(&self) -> Option<&Url> {
        self.secondary_mirror_url.as_ref()
    }

    /// Informational details page.
    #[must_use]
    pub fn details_url(&self) -> Option<&Url> {
        self.details_url.as_ref()
    }

    /// The page to hand the mirror resolver: primary, else secondary.
    #[must_use]
    pub fn target_url(&self) -> Option<&Url> {
        self.primary_mirror_url
            .as_ref()
            .or(self.secondary_mirror_url.as_ref())
    }

    /// Mirror pages in preference order.
    pub fn mirror_urls(&self) -> impl Iterator<Item = &Url> {
        self.primary_mirror_url
            .iter()
            .chain(self.secondary_mirror_url.iter())
    }
}

/// Builder that enforces the [`ResultItem`] invariants.
#[derive(Debug, Clone)]
pub struct ResultItemBuilder {
    item: ResultItem,
}

impl ResultItemBuilder {
    fn new(title: impl Into<String>) -> Self {
        Self {
            item: ResultItem {
                title: title.into().trim().to_string(),
                authors: NOT_AVAILABLE.to_string(),
                series: None,
                publisher_or_journal: None,
                year: None,
                pages: None,
                language: NOT_AVAILABLE.to_string(),
                size: NOT_AVAILABLE.to_string(),
                extension: UNKNOWN_EXTENSION.to_string(),
                doi: None,
                primary_mirror_url: None,
                secondary_mirror_url: None,
                details_url: None,
            },
        }
    }

    /// Sets authors; blank keeps `"N/A"`.
    #[must_use]
    pub fn authors(mut self, authors: impl Into<String>) -> Self {
        if let Some(value) = non_blank(authors.into()) {
            self.item.authors = value;
        }
        self
    }

    /// Sets series.
    #[must_use]
    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.item.series = non_blank(series.into());
        self
    }

    /// Sets publisher or journal.
    #[must_use]
    pub fn publisher_or_journal(mut self, value: impl Into<String>) -> Self {
        self.item.publisher_or_journal = non_blank(value.into());
        self
    }

    /// Sets year.
    #[must_use]
    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.item.year = non_blank(year.into());
        self
    }

    /// Sets page count.
    #[must_use]
    pub fn pages(mut self, pages: impl Into<String>) -> Self {
        self.item.pages = non_blank(pages.into());
        self
    }

    /// Sets language; blank keeps `"N/A"`.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        if let Some(value) = non_blank(language.into()) {
            self.item.language = value;
        }
        self
    }

    /// Sets size; blank keeps `"N/A"`.
    #[must_use]
    pub fn size(mut self, size: impl Into<String>) -> Self {
        if let Some(value) = non_blank(size.into()) {
            self.item.size = value;
        }
        self
    }

    /// Sets extension (lower-cased, leading dot dropped); blank keeps `"n/a"`.
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let cleaned = extension.trim().trim_start_matches('.').to_lowercase();
        if !cleaned.is_empty() {
            self.item.extension = cleaned;
        }
        self
    }

    /// Sets DOI.
    #[must_use]
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.item.doi = non_blank(doi.into());
        self
    }

    /// Sets the first mirror.
    #[must_use]
    pub fn primary_mirror(mut self, url: Option<Url>) -> Self {
        self.item.primary_mirror_url = url;
        self
    }

    /// Sets the second mirror.
    #[must_use]
    pub fn secondary_mirror(mut self, url: Option<Url>) -> Self {
        self.item.secondary_mirror_url = url;
        self
    }

    /// Sets the details page.
    #[must_use]
    pub fn details(mut self, url: Option<Url>) -> Self {
        self.item.details_url = url;
        self
    }

    /// Finishes the item.
    ///
    /// A missing primary mirror is backfilled from the details page. Returns
    /// `None` when the title is blank or no reachable page remains.
    #[must_use]
    pub fn build(mut self) -> Option<ResultItem> {
        if self.item.title.is_empty() {
            return None;
        }
        if self.item.primary_mirror_url.is_none() {
            self.item.primary_mirror_url = self.item.details_url.clone();
        }
        if self.item.primary_mirror_url.is_none() && self.item.secondary_mirror_url.is_none() {
            return None;
        }
        Some(self.item)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// All hits for one query, unpaginated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultSet {
    query: String,
    category: SearchCategory,
    source_url: Option<Url>,
    items: Vec<ResultItem>,
}

impl SearchResultSet {
    /// Creates a result set.
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        category: SearchCategory,
        source_url: Option<Url>,
        items: Vec<ResultItem>,
    ) -> Self {
        Self {
            query: query.into(),
            category,
            source_url,
            items,
        }
    }

    /// The user's query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Category searched.
    #[must_use]
    pub fn category(&self) -> SearchCategory {
        self.category
    }

    /// Final URL of the search page (the flow's first referer).
    #[must_use]
    pub fn source_url(&self) -> Option<&Url> {
        self.source_url.as_ref()
    }

    /// Hits in page order.
    #[must_use]
    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    /// Hit at zero-based `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ResultItem> {
        self.items.get(index)
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the query matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

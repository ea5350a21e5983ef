//! Platform-agnostic helpers for chat front ends.
//!
//! Nothing here talks to the network. A front end maps user input onto a
//! [`Category`], pages through a cached result set with [`PageWindow`],
//! guards selections with a [`SelectionView`], and turns a finished fetch
//! into a [`Reply`].

mod page;
mod reply;
mod view;

pub use page::{PageWindow, item_summary};
pub use reply::{
    ATTACHMENT_NAME_LIMIT, Attachment, Reply, ReplyTone, reply_for, shorten_attachment_name,
};
pub use view::{Selection, SelectionError, SelectionView, UserId};

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::search::{SearchCategory, SearchError};

/// Magazine index that replaces a search for the magazine category.
pub const MAGAZINE_INDEX_URL: &str = "http://magzdb.org/makelist";

/// Categories a user can pick.
///
/// Magazines are link-only: they never reach the search parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Sci-tech and non-fiction books.
    NonFiction,
    /// Fiction books.
    Fiction,
    /// Scientific journal articles.
    SciArticles,
    /// Magazine issues, answered with an index link.
    Magazines,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Self; 4] = [
        Self::NonFiction,
        Self::Fiction,
        Self::SciArticles,
        Self::Magazines,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self.search_category() {
            Some(category) => category.label(),
            None => "Magazines",
        }
    }

    /// Short value used on the command line and in chat option lists.
    #[must_use]
    pub fn wire_value(self) -> &'static str {
        match self {
            Self::NonFiction => "libgen",
            Self::Fiction => "fiction",
            Self::SciArticles => "scimag",
            Self::Magazines => "magz",
        }
    }

    /// The searchable category, or `None` for magazines.
    #[must_use]
    pub fn search_category(self) -> Option<SearchCategory> {
        match self {
            Self::NonFiction => Some(SearchCategory::NonFiction),
            Self::Fiction => Some(SearchCategory::Fiction),
            Self::SciArticles => Some(SearchCategory::SciArticles),
            Self::Magazines => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_value())
    }
}

impl From<SearchCategory> for Category {
    fn from(category: SearchCategory) -> Self {
        match category {
            SearchCategory::NonFiction => Self::NonFiction,
            SearchCategory::Fiction => Self::Fiction,
            SearchCategory::SciArticles => Self::SciArticles,
        }
    }
}

impl TryFrom<Category> for SearchCategory {
    type Error = SearchError;

    fn try_from(category: Category) -> Result<Self, Self::Error> {
        category
            .search_category()
            .ok_or_else(|| SearchError::LinkOnlyCategory {
                category: category.label().to_string(),
            })
    }
}

/// Input that names no known category.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown category '{input}' (expected one of: libgen, fiction, scimag, magz)")]
pub struct CategoryParseError {
    input: String,
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "libgen" | "nonfiction" | "scitech" | "books" => Ok(Self::NonFiction),
            "fiction" => Ok(Self::Fiction),
            "scimag" | "sciarticles" | "articles" => Ok(Self::SciArticles),
            "magz" | "magazines" | "magazine" => Ok(Self::Magazines),
            _ => Err(CategoryParseError {
                input: s.to_string(),
            }),
        }
    }
}

/// Magazine index link for `query`, form-encoded (spaces become `+`).
#[must_use]
pub fn magazine_link(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    format!("{MAGAZINE_INDEX_URL}?t={encoded}")
}

/// Usage guide shown by the help command.
pub const HELP_TEXT: &str = "\
Book Finder

Search Library Genesis for books, fiction and scientific articles.

How to use
  1. Run a search and pick a category: Non-Fiction, Fiction, Articles or Magazines.
  2. Enter your query: a title, an author, an ISBN or a DOI.
  3. Pick a result by its number to download it.
  4. When there are many results, move between pages.
  5. Magazines are not searched here; you get a link to the results on magzdb.org.

Search tips
  - Be specific: use full titles or ISBNs where you can.
  - If a title search fails, try just the author's last name.
  - Make sure you are searching the right category.
  - For scientific articles, a DOI is usually the most reliable query.
  - If a long title finds nothing, keep only the main keywords.
  - Check spelling and punctuation.

Copyright
  Please use this tool responsibly. Downloading copyrighted material without
  permission may be illegal where you live. Respect copyright law and the
  rights of authors and publishers; the authors of this tool are not
  responsible for how it is used.
";

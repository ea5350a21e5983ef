//! Fixed per-category request and column layouts.
//!
//! The aggregator renders each category with its own table shape. Layouts are
//! static tables, never inferred from the page: a column either sits at a
//! known index or is [`Column::Absent`] for that category.

use serde::Serialize;

/// Categories served by the search parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    /// Non-fiction / sci-tech books.
    NonFiction,
    /// Fiction.
    Fiction,
    /// Scientific journal articles.
    SciArticles,
}

impl SearchCategory {
    /// The fixed layout for this category.
    #[must_use]
    pub fn layout(self) -> &'static CategoryLayout {
        match self {
            Self::NonFiction => &NON_FICTION,
            Self::Fiction => &FICTION,
            Self::SciArticles => &SCI_ARTICLES,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NonFiction => "Non-Fiction / Sci-Tech",
            Self::Fiction => "Fiction",
            Self::SciArticles => "Scientific Articles",
        }
    }
}

/// Position of an optional field within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Field lives in the cell at this index.
    At(usize),
    /// Category does not expose this field.
    Absent,
}

impl Column {
    fn index(self) -> Option<usize> {
        match self {
            Self::At(index) => Some(index),
            Self::Absent => None,
        }
    }
}

/// Where the file format and size live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileColumns {
    /// Extension and size in their own cells.
    Separate {
        /// Extension cell index.
        extension: usize,
        /// Size cell index.
        size: usize,
    },
    /// One `"EXT / size"` cell.
    Combined(usize),
}

/// Where the mirror links live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorColumns {
    /// One anchor per dedicated cell.
    Separate {
        /// First mirror cell index.
        primary: usize,
        /// Second mirror cell index.
        secondary: usize,
    },
    /// All mirrors listed inside a single cell.
    Combined(usize),
}

/// Named field → cell index table for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Title cell (always present; rows without a title are dropped).
    pub title: usize,
    /// Author list.
    pub authors: Column,
    /// Series name.
    pub series: Column,
    /// Publisher (books) or journal (articles).
    pub publisher_or_journal: Column,
    /// Publication year.
    pub year: Column,
    /// Page count.
    pub pages: Column,
    /// Language.
    pub language: Column,
    /// Format/size cells.
    pub file: FileColumns,
    /// Mirror link cells.
    pub mirrors: MirrorColumns,
}

impl ColumnMap {
    /// Highest cell index any field references. Rows with no cell at this
    /// index are malformed and skipped whole.
    #[must_use]
    pub fn max_index(&self) -> usize {
        let optional = [
            self.authors,
            self.series,
            self.publisher_or_journal,
            self.year,
            self.pages,
            self.language,
        ]
        .into_iter()
        .filter_map(Column::index);
        let file = match self.file {
            FileColumns::Separate { extension, size } => extension.max(size),
            FileColumns::Combined(index) => index,
        };
        let mirrors = match self.mirrors {
            MirrorColumns::Separate { primary, secondary } => primary.max(secondary),
            MirrorColumns::Combined(index) => index,
        };
        optional
            .chain([self.title, file, mirrors])
            .max()
            .unwrap_or(self.title)
    }
}

/// Request shape and table layout for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLayout {
    /// Path joined onto the aggregator base URL.
    pub path: &'static str,
    /// Query-string parameter carrying the user's query.
    pub query_param: &'static str,
    /// Fixed extra query parameters (result count, view mode).
    pub extra_params: &'static [(&'static str, &'static str)],
    /// Results kept after parsing.
    pub result_cap: usize,
    /// CSS class of the results table.
    pub table_class: &'static str,
    /// Column positions.
    pub columns: ColumnMap,
}

static NON_FICTION: CategoryLayout = CategoryLayout {
    path: "search.php",
    query_param: "req",
    extra_params: &[
        ("res", "100"),
        ("view", "simple"),
        ("phrase", "1"),
        ("column", "def"),
    ],
    result_cap: 100,
    table_class: "c",
    columns: ColumnMap {
        title: 2,
        authors: Column::At(1),
        series: Column::Absent,
        publisher_or_journal: Column::At(3),
        year: Column::At(4),
        pages: Column::At(5),
        language: Column::At(6),
        file: FileColumns::Separate {
            extension: 8,
            size: 7,
        },
        mirrors: MirrorColumns::Separate {
            primary: 9,
            secondary: 10,
        },
    },
};

static FICTION: CategoryLayout = CategoryLayout {
    path: "fiction/",
    query_param: "q",
    extra_params: &[],
    result_cap: 25,
    table_class: "catalog",
    columns: ColumnMap {
        title: 2,
        authors: Column::At(0),
        series: Column::At(1),
        publisher_or_journal: Column::Absent,
        year: Column::Absent,
        pages: Column::Absent,
        language: Column::At(3),
        file: FileColumns::Combined(4),
        mirrors: MirrorColumns::Combined(5),
    },
};

static SCI_ARTICLES: CategoryLayout = CategoryLayout {
    path: "scimag/",
    query_param: "q",
    extra_params: &[],
    result_cap: 25,
    table_class: "catalog",
    columns: ColumnMap {
        title: 1,
        authors: Column::At(0),
        series: Column::Absent,
        publisher_or_journal: Column::At(2),
        year: Column::Absent,
        pages: Column::Absent,
        language: Column::Absent,
        file: FileColumns::Combined(3),
        mirrors: MirrorColumns::Combined(4),
    },
};

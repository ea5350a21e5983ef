//! Results-table parsing.
//!
//! The table is located by class first, then by a header row naming known
//! columns, then as the first multi-row table on the page. Each data row is
//! read through the category's [`ColumnMap`]; malformed rows are logged and
//! skipped, never fatal.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::error::{RowParseError, SearchError};
use super::item::ResultItem;
use super::layout::{CategoryLayout, Column, ColumnMap, FileColumns, MirrorColumns};
use crate::html::{
    ANCHOR_WITH_HREF, absolutize_href, collapse_whitespace, compile_static_regex,
    compile_static_selector, element_text,
};

static TABLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("table"));
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("li"));

/// One ISBN-10/13 (hyphens allowed) or Amazon ASIN.
const IDENTIFIER: &str = r"(?:[\d-]{9,16}[\dx]|b0[0-9a-z]{8})";

/// Trailing `[isbn, isbn]` / `(ASIN: B0...)` suffix.
static IDENTIFIER_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(&format!(
        r"(?i)\s*[\[(]\s*(?:(?:isbn|asin)(?:-1[03])?[:\s]*)?{IDENTIFIER}(?:\s*[,;]\s*{IDENTIFIER})*\s*[\])]\s*$"
    ))
});

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"10\.\d{4,9}/[^\s"<>]+"#));

/// Words that mark a table's first row as a header when locating the table.
const LOCATOR_HEADER_WORDS: &[&str] = &["author", "title", "doi", "journal", "series"];

/// Exact cell texts that mark a row as a header row.
const HEADER_CELL_WORDS: &[&str] = &[
    "id",
    "author",
    "authors",
    "author(s)",
    "title",
    "series",
    "publisher",
    "journal",
    "year",
    "pages",
    "language",
    "size",
    "extension",
    "file",
    "mirrors",
    "doi",
];

/// Phrases the aggregator prints instead of a table for zero hits.
const NO_RESULTS_MARKERS: &[&str] = &[
    "no files were found",
    "0 files found",
    "nothing found",
    "no articles were found",
    "no records found",
];

/// Href fragments that identify the title cell's details link.
const DETAILS_HREF_FRAGMENTS: &[&str] = &["md5=", "index.php", "fiction/", "scimag/", "book/"];

/// Parses every data row of the results table in `html`.
///
/// `page_url` is the final search page URL; relative hrefs are joined
/// against it. Output is truncated to the layout's result cap.
///
/// # Errors
///
/// Returns [`SearchError::NoResultsTable`] when no table is found and the
/// page does not say the query matched nothing.
pub(crate) fn parse_results(
    html: &str,
    page_url: &Url,
    layout: &CategoryLayout,
) -> Result<Vec<ResultItem>, SearchError> {
    let document = Html::parse_document(html);
    let Some(table) = locate_table(&document, layout.table_class) else {
        if says_no_results(html) {
            debug!(url = %page_url, "page reports zero results");
            return Ok(Vec::new());
        }
        return Err(SearchError::NoResultsTable {
            url: page_url.to_string(),
        });
    };

    let mut items = Vec::new();
    for (index, row) in table_rows(table).into_iter().enumerate() {
        if row.is_header() {
            continue;
        }
        match parse_row(&row.cells, page_url, &layout.columns) {
            Ok(item) => items.push(item),
            Err(reason) => warn!(row = index, %reason, "skipping result row"),
        }
    }

    if items.len() > layout.result_cap {
        debug!(
            parsed = items.len(),
            cap = layout.result_cap,
            "truncating results to cap"
        );
        items.truncate(layout.result_cap);
    }
    Ok(items)
}

fn says_no_results(html: &str) -> bool {
    let lowered = html.to_lowercase();
    NO_RESULTS_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn locate_table<'a>(document: &'a Html, table_class: &str) -> Option<ElementRef<'a>> {
    if let Ok(by_class) = Selector::parse(&format!("table.{table_class}"))
        && let Some(table) = document.select(&by_class).next()
    {
        return Some(table);
    }
    debug!(table_class, "results table not found by class, trying header match");

    let by_header = document.select(&TABLE).find(|table| {
        table_rows(*table).first().is_some_and(|first| {
            first.cells.iter().any(|cell| {
                let text = element_text(*cell).to_lowercase();
                LOCATOR_HEADER_WORDS.iter().any(|word| text.contains(word))
            })
        })
    });
    if by_header.is_some() {
        return by_header;
    }

    document
        .select(&TABLE)
        .find(|table| table_rows(*table).len() > 1)
}

struct Row<'a> {
    cells: Vec<ElementRef<'a>>,
    in_head: bool,
    has_th: bool,
}

impl Row<'_> {
    fn is_header(&self) -> bool {
        if self.in_head || self.has_th {
            return true;
        }
        let keyword_cells = self
            .cells
            .iter()
            .filter(|cell| {
                let text = element_text(**cell).to_lowercase();
                let text = text.trim_end_matches(':');
                HEADER_CELL_WORDS.contains(&text)
            })
            .count();
        keyword_cells >= 2
    }
}

/// Rows owned by `table` itself (nested tables are not descended into).
fn table_rows(table: ElementRef<'_>) -> Vec<Row<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(build_row(child, false)),
            section @ ("thead" | "tbody" | "tfoot") => {
                let in_head = section == "thead";
                rows.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|el| el.value().name() == "tr")
                        .map(|tr| build_row(tr, in_head)),
                );
            }
            _ => {}
        }
    }
    rows
}

fn build_row(tr: ElementRef<'_>, in_head: bool) -> Row<'_> {
    let cells: Vec<ElementRef<'_>> = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect();
    let has_th = cells.iter().any(|cell| cell.value().name() == "th");
    Row {
        cells,
        in_head,
        has_th,
    }
}

fn parse_row(
    cells: &[ElementRef<'_>],
    page_url: &Url,
    columns: &ColumnMap,
) -> Result<ResultItem, RowParseError> {
    let max_index = columns.max_index();
    if cells.len() <= max_index {
        return Err(RowParseError::TooFewCells {
            found: cells.len(),
            needed: max_index + 1,
        });
    }

    let title_cell = cells[columns.title];
    let details_anchor = title_cell.select(&ANCHOR_WITH_HREF).find(|anchor| {
        anchor.value().attr("href").is_some_and(|href| {
            let href = href.to_ascii_lowercase();
            DETAILS_HREF_FRAGMENTS
                .iter()
                .any(|fragment| href.contains(fragment))
        })
    });

    let raw_title = details_anchor
        .map(text_without_italics)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| text_without_italics(title_cell));
    let title = strip_identifier_suffix(&raw_title);
    if title.is_empty() {
        return Err(RowParseError::MissingTitle);
    }

    let details_url = details_anchor
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| absolutize_href(href, page_url));
    let doi = DOI_RE
        .find(&element_text(title_cell))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string());

    let mut builder = ResultItem::builder(title.clone()).details(details_url);
    if let Some(doi) = doi {
        builder = builder.doi(doi);
    }
    if let Some(cell) = cell_at(cells, columns.authors) {
        builder = builder.authors(authors_text(cell));
    }
    if let Some(cell) = cell_at(cells, columns.series) {
        builder = builder.series(element_text(cell));
    }
    if let Some(cell) = cell_at(cells, columns.publisher_or_journal) {
        builder = builder.publisher_or_journal(element_text(cell));
    }
    if let Some(cell) = cell_at(cells, columns.year) {
        builder = builder.year(element_text(cell));
    }
    if let Some(cell) = cell_at(cells, columns.pages) {
        builder = builder.pages(element_text(cell));
    }
    if let Some(cell) = cell_at(cells, columns.language) {
        builder = builder.language(element_text(cell));
    }

    builder = match columns.file {
        FileColumns::Separate { extension, size } => builder
            .extension(element_text(cells[extension]))
            .size(element_text(cells[size])),
        FileColumns::Combined(index) => {
            let (extension, size) = split_file_cell(&element_text(cells[index]));
            builder.extension(extension).size(size)
        }
    };

    let (primary, secondary) = match columns.mirrors {
        MirrorColumns::Separate { primary, secondary } => (
            first_link(cells[primary], page_url),
            first_link(cells[secondary], page_url),
        ),
        MirrorColumns::Combined(index) => {
            let mut links = http_links(cells[index], page_url).into_iter();
            (links.next(), links.next())
        }
    };

    builder
        .primary_mirror(primary)
        .secondary_mirror(secondary)
        .build()
        .ok_or(RowParseError::NoMirror { title })
}

fn cell_at<'a>(cells: &[ElementRef<'a>], column: Column) -> Option<ElementRef<'a>> {
    match column {
        Column::At(index) => cells.get(index).copied(),
        Column::Absent => None,
    }
}

/// Removes every trailing bracketed ISBN/ASIN group.
#[must_use]
pub fn strip_identifier_suffix(title: &str) -> String {
    let mut current = collapse_whitespace(title);
    loop {
        let stripped = IDENTIFIER_SUFFIX_RE.replace(&current, "").trim().to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Text of `element`, skipping `<i>` subtrees (where ISBNs are printed).
fn text_without_italics(element: ElementRef<'_>) -> String {
    fn collect(element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
            } else if let Some(el) = ElementRef::wrap(child) {
                match el.value().name() {
                    "i" => {}
                    "br" => out.push(' '),
                    _ => collect(el, out),
                }
            }
        }
    }
    let mut out = String::new();
    collect(element, &mut out);
    collapse_whitespace(&out)
}

fn authors_text(cell: ElementRef<'_>) -> String {
    let names: Vec<String> = cell
        .select(&LIST_ITEM)
        .map(element_text)
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        element_text(cell)
    } else {
        names.join(", ")
    }
}

/// Splits `"EPUB / 1.2 MB"` into extension and size. Without a separator
/// the whole text is the extension.
fn split_file_cell(text: &str) -> (String, String) {
    match text.split_once('/') {
        Some((extension, size)) => (extension.trim().to_string(), size.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

fn first_link(cell: ElementRef<'_>, page_url: &Url) -> Option<Url> {
    cell.select(&ANCHOR_WITH_HREF)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find_map(|href| absolutize_href(href, page_url))
}

fn http_links(cell: ElementRef<'_>, page_url: &Url) -> Vec<Url> {
    cell.select(&ANCHOR_WITH_HREF)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| href.trim().to_ascii_lowercase().starts_with("http"))
        .filter_map(|href| absolutize_href(href, page_url))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::SearchCategory;

    fn page(path: &str) -> Url {
        Url::parse(&format!("https://libgen.example/{path}")).unwrap()
    }

    const NON_FICTION_PAGE: &str = r##"<html><body>
<table width=100%><tr><td>site header</td></tr></table>
<table class=c width=100%>
<tr valign=top bgcolor=#C0C0C0>
  <td><b>ID</b></td><td><b>Author(s)</b></td><td><b>Title</b></td><td><b>Publisher</b></td>
  <td><b>Year</b></td><td><b>Pages</b></td><td><b>Language</b></td><td><b>Size</b></td>
  <td><b>Extension</b></td><td colspan=2><b>Mirrors</b></td>
</tr>
<tr valign=top>
  <td>101</td>
  <td><a href="search.php?req=Frank+Herbert">Frank Herbert</a></td>
  <td><a href="book/index.php?md5=AAA111" title="" id=101>Dune [9780441172719]<br><font face=Times color=green><i>0441172717, 9780441172719</i></font></a></td>
  <td>Ace</td><td>1990</td><td>535</td><td>English</td><td>2 Mb</td><td>EPUB</td>
  <td><a href="http://mirror-one.example/main/AAA111" title="this mirror">[1]</a></td>
  <td><a href="https://mirror-two.example/ads.php?md5=AAA111">[2]</a></td>
</tr>
<tr valign=top>
  <td>102</td><td>Someone</td>
  <td><a href="book/index.php?md5=BBB222">Short Row</a></td>
</tr>
<tr valign=top>
  <td>103</td><td></td>
  <td><a href="book/index.php?md5=CCC333">Dune Messiah (ISBN: 0-441-17269-9)</a></td>
  <td></td><td></td><td></td><td></td><td></td><td>pdf</td>
  <td></td><td></td>
</tr>
</table></body></html>"##;

    #[test]
    fn test_non_fiction_rows_parsed_with_separate_columns() {
        let items = parse_results(
            NON_FICTION_PAGE,
            &page("search.php?req=dune"),
            SearchCategory::NonFiction.layout(),
        )
        .unwrap();

        assert_eq!(items.len(), 2, "short row must be dropped: {items:?}");
        let dune = &items[0];
        assert_eq!(dune.title(), "Dune");
        assert_eq!(dune.authors(), "Frank Herbert");
        assert_eq!(dune.publisher_or_journal(), Some("Ace"));
        assert_eq!(dune.year(), Some("1990"));
        assert_eq!(dune.pages(), Some("535"));
        assert_eq!(dune.language(), "English");
        assert_eq!(dune.size(), "2 Mb");
        assert_eq!(dune.extension(), "epub");
        assert_eq!(
            dune.primary_mirror_url().unwrap().as_str(),
            "http://mirror-one.example/main/AAA111"
        );
        assert_eq!(
            dune.secondary_mirror_url().unwrap().as_str(),
            "https://mirror-two.example/ads.php?md5=AAA111"
        );
        assert_eq!(
            dune.details_url().unwrap().as_str(),
            "https://libgen.example/book/index.php?md5=AAA111"
        );
    }

    #[test]
    fn test_row_without_mirrors_falls_back_to_details_page() {
        let items = parse_results(
            NON_FICTION_PAGE,
            &page("search.php?req=dune"),
            SearchCategory::NonFiction.layout(),
        )
        .unwrap();

        let messiah = &items[1];
        assert_eq!(messiah.title(), "Dune Messiah");
        assert_eq!(messiah.authors(), "N/A");
        assert_eq!(
            messiah.primary_mirror_url(),
            messiah.details_url(),
            "details page is the primary mirror fallback"
        );
        assert!(messiah.secondary_mirror_url().is_none());
    }

    const FICTION_PAGE: &str = r##"<html><body>
<table class="catalog">
<thead><tr><th>Author(s)</th><th>Series</th><th>Title</th><th>Language</th><th>File</th><th>Mirrors</th></tr></thead>
<tbody>
<tr>
  <td><ul class="catalog_authors"><li><a href="/fiction/?q=Le+Guin">Ursula K. Le Guin</a></li><li><a href="#">Someone Else</a></li></ul></td>
  <td>Earthsea</td>
  <td><p><a href="/fiction/D1D1D1">A Wizard of Earthsea</a></p><p class="catalog_identifier">ISBN: 9780547773742</p></td>
  <td>English</td>
  <td title="Uploaded at 2020">EPUB / 1.1 MB</td>
  <td><ul class="record_mirrors_compact">
    <li><a href="/fiction/local/D1D1D1">[local]</a></li>
    <li><a href="http://library.example/fiction/D1D1D1" title="Libgen.rs">[1]</a></li>
    <li><a href="https://other.example/get?md5=D1D1D1">[2]</a></li>
    <li><a href="https://third.example/x">[3]</a></li>
  </ul></td>
</tr>
<tr>
  <td>Nobody</td><td></td><td><a href="/fiction/E2E2E2">Unpriced</a></td><td>French</td><td>PDF</td>
  <td><a href="https://other.example/get?md5=E2E2E2">[1]</a></td>
</tr>
</tbody></table></body></html>"##;

    #[test]
    fn test_fiction_combined_cells() {
        let items = parse_results(
            FICTION_PAGE,
            &page("fiction/?q=earthsea"),
            SearchCategory::Fiction.layout(),
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        let wizard = &items[0];
        assert_eq!(wizard.title(), "A Wizard of Earthsea");
        assert_eq!(wizard.authors(), "Ursula K. Le Guin, Someone Else");
        assert_eq!(wizard.series(), Some("Earthsea"));
        assert_eq!(wizard.extension(), "epub");
        assert_eq!(wizard.size(), "1.1 MB");
        assert_eq!(
            wizard.primary_mirror_url().unwrap().as_str(),
            "http://library.example/fiction/D1D1D1"
        );
        assert_eq!(
            wizard.secondary_mirror_url().unwrap().as_str(),
            "https://other.example/get?md5=D1D1D1"
        );

        let unpriced = &items[1];
        assert_eq!(unpriced.extension(), "pdf");
        assert_eq!(unpriced.size(), "N/A");
        assert!(unpriced.secondary_mirror_url().is_none());
    }

    const SCIMAG_PAGE: &str = r#"<html><body>
<table class="catalog">
<thead><tr><th>Author(s)</th><th>Article</th><th>Journal</th><th>File</th><th>Mirrors</th></tr></thead>
<tbody>
<tr>
  <td>Watson J.; Crick F.</td>
  <td><p><a href="/scimag/10.1038/171737a0">Molecular Structure of Nucleic Acids</a></p><p>DOI: 10.1038/171737a0</p></td>
  <td><p><a href="/scimag/journals/1">Nature</a></p><p>volume 171, issue 4356</p></td>
  <td>PDF / 800 kB</td>
  <td><ul><li><a href="https://sci-hub.example/10.1038/171737a0">Sci-Hub</a></li><li><a href="http://library.example/scimag/10.1038/171737a0">Libgen</a></li></ul></td>
</tr>
</tbody></table></body></html>"#;

    #[test]
    fn test_scimag_row_exposes_doi_and_journal() {
        let items = parse_results(
            SCIMAG_PAGE,
            &page("scimag/?q=nucleic"),
            SearchCategory::SciArticles.layout(),
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        let article = &items[0];
        assert_eq!(article.title(), "Molecular Structure of Nucleic Acids");
        assert_eq!(article.doi(), Some("10.1038/171737a0"));
        assert!(article.publisher_or_journal().unwrap().starts_with("Nature"));
        assert_eq!(article.extension(), "pdf");
        assert_eq!(
            article.primary_mirror_url().unwrap().host_str(),
            Some("sci-hub.example")
        );
    }

    #[test]
    fn test_header_only_table_is_empty_not_error() {
        let html = r#"<table class="catalog"><thead><tr><th>Author(s)</th><th>Title</th></tr></thead><tbody></tbody></table>"#;
        let items = parse_results(
            html,
            &page("fiction/?q=zzz"),
            SearchCategory::Fiction.layout(),
        )
        .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_no_table_with_no_results_message_is_empty() {
        let html = "<html><body><p>No files were found.</p></body></html>";
        let items = parse_results(
            html,
            &page("fiction/?q=zzz"),
            SearchCategory::Fiction.layout(),
        )
        .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_no_table_without_message_is_error() {
        let html = "<html><body><p>Service temporarily overloaded</p></body></html>";
        let err = parse_results(
            html,
            &page("search.php?req=x"),
            SearchCategory::NonFiction.layout(),
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::NoResultsTable { .. }));
    }

    #[test]
    fn test_fallback_to_header_matched_table() {
        let html = r#"<html><body>
<table><tr><td>nav</td></tr></table>
<table id="results">
<tr><td>Author</td><td>Series</td><td>Title</td><td>Language</td><td>File</td><td>Mirrors</td></tr>
<tr><td>A. Writer</td><td></td><td><a href="/fiction/F3F3">Found By Header</a></td><td>English</td><td>MOBI / 300 kB</td>
<td><a href="https://m.example/1">1</a></td></tr>
</table></body></html>"#;
        let items = parse_results(html, &page("fiction/?q=x"), SearchCategory::Fiction.layout())
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title(), "Found By Header");
    }

    #[test]
    fn test_fallback_to_first_multi_row_table() {
        let html = r#"<html><body>
<table><tr><td>only one row</td></tr></table>
<table>
<tr><td>0</td><td>X. Writer</td><td><a href="book/index.php?md5=F4">First Multi Row</a></td><td>P</td><td>2001</td><td>10</td><td>English</td><td>1 Mb</td><td>djvu</td><td><a href="https://m.example/1">1</a></td><td></td></tr>
<tr><td>1</td><td>short</td></tr>
</table></body></html>"#;
        let items = parse_results(
            html,
            &page("search.php?req=x"),
            SearchCategory::NonFiction.layout(),
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].extension(), "djvu");
    }

    #[test]
    fn test_results_truncated_to_cap() {
        let row = r#"<tr><td>A</td><td></td><td><a href="/fiction/X">T</a></td><td>en</td><td>PDF</td><td><a href="https://m.example/x">1</a></td></tr>"#;
        let html = format!(r#"<table class="catalog">{}</table>"#, row.repeat(40));
        let layout = SearchCategory::Fiction.layout();
        let items = parse_results(&html, &page("fiction/?q=t"), layout).unwrap();
        assert_eq!(items.len(), layout.result_cap);
    }

    #[test]
    fn test_strip_identifier_suffix_variants() {
        assert_eq!(strip_identifier_suffix("Dune [9780441172719]"), "Dune");
        assert_eq!(
            strip_identifier_suffix("Dune (ISBN: 0441172717, 9780441172719)"),
            "Dune"
        );
        assert_eq!(strip_identifier_suffix("Dune [B00B7NPRY8]"), "Dune");
        assert_eq!(
            strip_identifier_suffix("Dune [0441172717] (9780441172719)"),
            "Dune"
        );
        assert_eq!(strip_identifier_suffix("Dune (1965)"), "Dune (1965)");
        assert_eq!(strip_identifier_suffix("Vol. [2]"), "Vol. [2]");
    }

    #[test]
    fn test_split_file_cell() {
        assert_eq!(
            split_file_cell("EPUB / 1.2 MB"),
            ("EPUB".to_string(), "1.2 MB".to_string())
        );
        assert_eq!(split_file_cell("pdf"), ("pdf".to_string(), String::new()));
    }
}

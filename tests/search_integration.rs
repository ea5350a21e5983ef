//! Integration tests for the search module.
//!
//! These tests serve aggregator pages from a mock HTTP server and run the full
//! request → parse flow through the real HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use bookfinder_core::context::RequestContext;
use bookfinder_core::search::{SearchCategory, SearchError, Searcher, strip_identifier_suffix};
use bookfinder_core::transport::HttpTransport;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FICTION_PAGE: &str = r#"<html><body>
<table class="catalog">
<thead><tr><th>Author(s)</th><th>Series</th><th>Title</th><th>Language</th><th>File</th><th>Mirrors</th></tr></thead>
<tbody>
<tr>
  <td><ul class="catalog_authors"><li><a href="/fiction/?q=Le+Guin">Ursula K. Le Guin</a></li></ul></td>
  <td>Earthsea</td>
  <td><p><a href="/fiction/ABCDEF">A Wizard of Earthsea</a></p></td>
  <td>English</td>
  <td>EPUB / 310 Kb</td>
  <td><ul class="record_mirrors_compact">
    <li><a href="http://mirror-one.example/fiction/ABCDEF">[1]</a></li>
    <li><a href="https://mirror-two.example/get/ABCDEF">[2]</a></li>
  </ul></td>
</tr>
</tbody>
</table></body></html>"#;

fn searcher(server: &MockServer) -> Searcher {
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(5)).expect("client"));
    Searcher::new(
        transport,
        Url::parse(&format!("{}/", server.uri())).expect("base url"),
        Duration::from_secs(5),
        1024 * 1024,
    )
}

#[tokio::test]
async fn test_fiction_search_parses_rows_and_records_referer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fiction/"))
        .and(query_param("q", "earthsea"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .set_body_string(FICTION_PAGE),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = RequestContext::new();
    let results = searcher(&server)
        .search("  earthsea ", SearchCategory::Fiction, &mut ctx)
        .await
        .expect("search should succeed");

    assert_eq!(results.query(), "earthsea");
    assert_eq!(results.len(), 1);
    let item = &results.items()[0];
    assert_eq!(item.title(), "A Wizard of Earthsea");
    assert_eq!(item.authors(), "Ursula K. Le Guin");
    assert_eq!(item.series(), Some("Earthsea"));
    assert_eq!(item.extension(), "epub");
    assert_eq!(item.size(), "310 Kb");
    assert_eq!(
        item.secondary_mirror_url().map(Url::as_str),
        Some("https://mirror-two.example/get/ABCDEF")
    );

    let referer = ctx.referer().expect("search page recorded as referer");
    assert_eq!(referer.path(), "/fiction/");
    assert_eq!(results.source_url(), Some(referer));
}

#[tokio::test]
async fn test_non_fiction_search_sends_fixed_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("req", "rust programming"))
        .and(query_param("res", "100"))
        .and(query_param("view", "simple"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><table class=c><tr><td>ID</td><td>Author(s)</td><td>Title</td></tr></table></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let results = searcher(&server)
        .search("rust programming", SearchCategory::NonFiction, &mut RequestContext::new())
        .await
        .expect("header-only table is an empty result");
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_no_files_found_page_is_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scimag/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>No articles were found.</p></body></html>"),
        )
        .mount(&server)
        .await;

    let results = searcher(&server)
        .search("10.1000/none", SearchCategory::SciArticles, &mut RequestContext::new())
        .await
        .expect("no-results page is not an error");
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_server_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut ctx = RequestContext::new();
    let err = searcher(&server)
        .search("dune", SearchCategory::NonFiction, &mut ctx)
        .await
        .expect_err("503 must fail");
    assert!(
        matches!(err, SearchError::HttpStatus { status: 503, .. }),
        "unexpected error: {err:?}"
    );
    assert!(ctx.referer().is_none(), "failed page must not become referer");
}

#[tokio::test]
async fn test_page_without_table_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Maintenance</body></html>"),
        )
        .mount(&server)
        .await;

    let err = searcher(&server)
        .search("dune", SearchCategory::Fiction, &mut RequestContext::new())
        .await
        .expect_err("no table, no message");
    assert!(matches!(err, SearchError::NoResultsTable { .. }));
}

#[tokio::test]
async fn test_blank_query_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = searcher(&server)
        .search("   ", SearchCategory::Fiction, &mut RequestContext::new())
        .await
        .expect_err("blank query");
    assert!(matches!(err, SearchError::EmptyQuery));
}

#[tokio::test]
async fn test_unreachable_aggregator() {
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(2)).expect("client"));
    let searcher = Searcher::new(
        transport,
        Url::parse("http://127.0.0.1:9/").expect("url"),
        Duration::from_secs(2),
        1024,
    );
    let err = searcher
        .search("dune", SearchCategory::Fiction, &mut RequestContext::new())
        .await
        .expect_err("nothing listens on port 9");
    assert!(matches!(err, SearchError::Unreachable { .. }));
}

#[test]
fn test_identifier_suffix_stripping_is_public() {
    assert_eq!(strip_identifier_suffix("Dune  [9780441172719]"), "Dune");
    assert_eq!(strip_identifier_suffix("Dune (1965)"), "Dune (1965)");
}

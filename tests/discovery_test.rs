//! Integration tests for snapshot discovery and grouping.

use wayback_press::cdx::{month_range, CdxClient};
use wayback_press::classify::PageClass;
use wayback_press::config::Config;
use wayback_press::group::group_snapshots;
use wayback_press::progress::Progress;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CDX_BODY: &str = r#"[["timestamp","original"],
["20200101000000","http://example.com/2020/05/my-post"],
["20200601000000","http://example.com/2020/05/my-post"],
["20190301000000","http://example.com/about.html"]]"#;

async fn mock_cdx(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> CdxClient {
    CdxClient::with_endpoint(
        &Config::for_testing(),
        format!("{}/cdx/search/cdx", server.uri()),
    )
}

#[tokio::test]
async fn test_fetch_parses_rows_and_skips_header() {
    let server = MockServer::start().await;
    mock_cdx(&server, ResponseTemplate::new(200).set_body_string(CDX_BODY)).await;

    let snapshots = client_for(&server)
        .fetch_all_snapshots("example.com", &Progress::detached())
        .await
        .expect("fetch failed");

    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0].timestamp, "20200101000000");
    assert_eq!(
        snapshots[0].archive_url,
        "https://web.archive.org/web/20200101000000/http://example.com/2020/05/my-post"
    );
}

#[tokio::test]
async fn test_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .and(query_param("url", "example.com/*"))
        .and(query_param("output", "json"))
        .and(query_param("fl", "timestamp,original"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let snapshots = client_for(&server)
        .fetch_all_snapshots("example.com", &Progress::detached())
        .await
        .expect("fetch failed");
    assert!(snapshots.is_empty());
}

#[tokio::test]
async fn test_rate_limit_consumes_attempt_then_succeeds() {
    let server = MockServer::start().await;
    // First attempt is rate limited, second succeeds; the configured backoff
    // is milliseconds in tests so this stays fast.
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mock_cdx(&server, ResponseTemplate::new(200).set_body_string(CDX_BODY)).await;

    let snapshots = client_for(&server)
        .fetch_all_snapshots("example.com", &Progress::detached())
        .await
        .expect("fetch failed");
    assert_eq!(snapshots.len(), 3);
}

#[tokio::test]
async fn test_persistent_server_error_is_empty_result() {
    let server = MockServer::start().await;
    mock_cdx(&server, ResponseTemplate::new(503)).await;

    let snapshots = client_for(&server)
        .fetch_all_snapshots("example.com", &Progress::detached())
        .await
        .expect("non-200 should not be a hard failure");
    assert!(snapshots.is_empty());
}

#[tokio::test]
async fn test_single_row_scenario_end_to_end() {
    let server = MockServer::start().await;
    let body = r#"[["timestamp","original"],["20200101000000","http://example.com/2020/05/my-post"]]"#;
    mock_cdx(&server, ResponseTemplate::new(200).set_body_string(body)).await;

    let snapshots = client_for(&server)
        .fetch_all_snapshots("example.com", &Progress::detached())
        .await
        .expect("fetch failed");

    let inventory = group_snapshots(&snapshots, &Progress::detached());
    let bucket = inventory
        .bucket(PageClass::BlogPost)
        .expect("blog post bucket");
    assert_eq!(bucket.len(), 1);
    assert!(bucket.contains_key("example.com/2020/05/my-post"));
}

#[tokio::test]
async fn test_month_range_over_fetched_snapshots() {
    let server = MockServer::start().await;
    mock_cdx(&server, ResponseTemplate::new(200).set_body_string(CDX_BODY)).await;

    let snapshots = client_for(&server)
        .fetch_all_snapshots("example.com", &Progress::detached())
        .await
        .expect("fetch failed");

    assert_eq!(
        month_range(&snapshots),
        Some(("2019-03".to_string(), "2020-06".to_string()))
    );
}

//! Download validation and retry behavior against a mock portal

mod common;

use std::time::Duration;

use guidescrape::fetch::{DocumentFetcher, FetchError, RetryPolicy};

fn fast_fetcher(base: &str, retries: u32) -> DocumentFetcher {
    DocumentFetcher::with_policy(base, RetryPolicy::new(retries, Duration::from_millis(10)))
        .expect("fetcher builds")
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_success() {
    let mut server = mockito::Server::new_async().await;
    let busy = server
        .mock("GET", "/files/guide.doc")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;
    let body = common::fake_doc_bytes();

    let dir = common::create_test_dir().expect("tempdir");
    let dest = dir.path().join("guide.doc");
    let fetcher = fast_fetcher(&server.url(), 1);

    // Both attempts consume the 503 mock
    let first = fetcher.fetch("/files/guide.doc", &dest).await;
    assert!(matches!(first, Err(FetchError::BadStatus { status: 503 })));
    busy.assert_async().await;

    let ok = server
        .mock("GET", "/files/guide.doc")
        .with_status(200)
        .with_header("content-type", "application/msword")
        .with_body(body.clone())
        .expect(1)
        .create_async()
        .await;

    // 503s exhausted; the served document now passes all checks
    let retried = fast_fetcher(&server.url(), 0)
        .fetch("/files/guide.doc", &dest)
        .await;
    assert!(retried.is_ok(), "unexpected error: {retried:?}");
    ok.assert_async().await;
    assert_eq!(std::fs::read(&dest).expect("file exists"), body);
}

#[tokio::test]
async fn undersized_body_is_rejected_and_removed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/files/tiny.doc")
        .with_status(200)
        .with_header("content-type", "application/msword")
        .with_body(vec![0u8; 120])
        .expect(1)
        .create_async()
        .await;

    let dir = common::create_test_dir().expect("tempdir");
    let dest = dir.path().join("tiny.doc");
    let result = fast_fetcher(&server.url(), 0)
        .fetch("/files/tiny.doc", &dest)
        .await;

    assert!(matches!(result, Err(FetchError::TooSmall { size: 120 })));
    assert!(!dest.exists(), "partial download must be deleted");
    mock.assert_async().await;
}

#[tokio::test]
async fn html_error_page_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/files/masked.doc")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html><body>Phiên làm việc đã hết hạn</body></html>")
        .create_async()
        .await;

    let dir = common::create_test_dir().expect("tempdir");
    let dest = dir.path().join("masked.doc");
    let result = fast_fetcher(&server.url(), 0)
        .fetch("/files/masked.doc", &dest)
        .await;

    assert!(matches!(result, Err(FetchError::HtmlErrorPage { .. })));
    assert!(!dest.exists());
}

#[tokio::test]
async fn not_found_is_surfaced_after_retry_budget() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/files/gone.doc")
        .with_status(404)
        .expect(3)
        .create_async()
        .await;

    let dir = common::create_test_dir().expect("tempdir");
    let dest = dir.path().join("gone.doc");
    let result = fast_fetcher(&server.url(), 2)
        .fetch("/files/gone.doc", &dest)
        .await;

    assert!(matches!(result, Err(FetchError::BadStatus { status: 404 })));
    mock.assert_async().await;
}

//! Integration tests for the reqwest transport and the Files API uploader,
//! run against an in-process HTTP server on 127.0.0.1.
//!
//! These call `HttpTransport::get` directly: the full pipeline would
//! (correctly) refuse to fetch a loopback address.

mod common;

use html2md::error::UploadError;
use html2md::pipeline::fetch::{HttpTransport, ReqwestTransport};
use html2md::upload::{upload_file, UploadClient};
use html2md::{ConversionConfig, Html2MdError};
use tempfile::TempDir;
use url::Url;

fn transport(max_bytes: u64) -> ReqwestTransport {
    let config = ConversionConfig::builder()
        .max_content_bytes(max_bytes)
        .timeout_secs(5)
        .build()
        .unwrap();
    ReqwestTransport::new(&config).unwrap()
}

// ── Transport ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn returns_body_for_200() {
    let server = common::start(common::response(
        "200 OK",
        &[("Content-Type", "text/html; charset=utf-8")],
        b"<h1>Hello</h1>",
    ));
    let url = Url::parse(&server.base).unwrap();
    let resp = transport(1024).get(&url).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "<h1>Hello</h1>");
}

#[tokio::test]
async fn does_not_follow_redirects() {
    let server = common::start(common::response(
        "302 Found",
        &[("Location", "http://169.254.169.254/latest/meta-data/")],
        b"",
    ));
    let url = Url::parse(&server.base).unwrap();
    let resp = transport(1024).get(&url).await.unwrap();
    assert_eq!(resp.status, 302);
    assert!(resp.is_redirect());
    assert_eq!(
        resp.location.as_deref(),
        Some("http://169.254.169.254/latest/meta-data/")
    );
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn sends_browser_headers() {
    let server = common::start(common::response("200 OK", &[], b"ok"));
    let url = Url::parse(&server.base).unwrap();
    transport(1024).get(&url).await.unwrap();
    let request = server.requests().remove(0).to_ascii_lowercase();
    assert!(request.starts_with("get / http/1.1"), "{request}");
    assert!(request.contains("user-agent: mozilla/5.0"), "{request}");
    assert!(request.contains("accept-language:"), "{request}");
}

#[tokio::test]
async fn rejects_declared_length_over_limit() {
    let body = vec![b'a'; 100];
    let server = common::start(common::response("200 OK", &[], &body));
    let url = Url::parse(&server.base).unwrap();
    let err = transport(10).get(&url).await.unwrap_err();
    assert!(
        matches!(err, Html2MdError::ContentTooLarge { declared: 100, limit: 10 }),
        "{err:?}"
    );
}

#[tokio::test]
async fn rejects_streamed_body_over_limit() {
    // No Content-Length: the body runs until the connection closes.
    let mut raw = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec();
    raw.extend(std::iter::repeat(b'x').take(100));
    let server = common::start(raw);
    let url = Url::parse(&server.base).unwrap();
    let err = transport(10).get(&url).await.unwrap_err();
    assert!(
        matches!(err, Html2MdError::ContentExceededLimit { limit: 10 }),
        "{err:?}"
    );
    assert_eq!(err.to_string(), "Content exceeded limit of 10 bytes");
}

#[tokio::test]
async fn decodes_declared_charset() {
    // "café" in ISO-8859-1.
    let server = common::start(common::response(
        "200 OK",
        &[("Content-Type", "text/html; charset=ISO-8859-1")],
        b"caf\xe9",
    ));
    let url = Url::parse(&server.base).unwrap();
    let resp = transport(1024).get(&url).await.unwrap();
    assert_eq!(resp.body, "café");
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
    let server = common::start(common::response("404 Not Found", &[], b"missing"));
    let url = Url::parse(&server.base).unwrap();
    let resp = transport(1024).get(&url).await.unwrap();
    assert_eq!(resp.status, 404);
    assert!(!resp.is_success());
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    let err = transport(1024).get(&url).await.unwrap_err();
    assert!(matches!(err, Html2MdError::Network { .. }), "{err:?}");
    assert_eq!(err.category().prefix(), "Network error:");
}

// ── Upload ───────────────────────────────────────────────────────────────────

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn upload_posts_multipart_with_api_headers() {
    let server = common::start(common::response(
        "200 OK",
        &[("Content-Type", "application/json")],
        br#"{"id":"file_abc123","type":"file","filename":"page.md","mime_type":"text/markdown","size_bytes":8}"#,
    ));
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "page.md", "# Title\n");

    let client = UploadClient::new("sk-test").unwrap().with_endpoint(&server.base);
    let uploaded = upload_file(&path, &client).await.unwrap();
    assert_eq!(uploaded.id, "file_abc123");
    assert_eq!(uploaded.filename.as_deref(), Some("page.md"));

    let request = server.requests().remove(0);
    let lower = request.to_ascii_lowercase();
    assert!(lower.starts_with("post / http/1.1"), "{request}");
    assert!(lower.contains("x-api-key: sk-test"));
    assert!(lower.contains("anthropic-version: 2023-06-01"));
    assert!(lower.contains("anthropic-beta: files-api-2025-04-14"));
    assert!(lower.contains("content-type: multipart/form-data"));
    assert!(request.contains(r#"name="file"; filename="page.md""#), "{request}");
    assert!(lower.contains("content-type: text/markdown"), "{request}");
    assert!(request.contains("# Title"));
}

#[tokio::test]
async fn upload_surfaces_api_error_message() {
    let server = common::start(common::response(
        "401 Unauthorized",
        &[("Content-Type", "application/json")],
        br#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
    ));
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "page.md", "x");

    let client = UploadClient::new("bad").unwrap().with_endpoint(&server.base);
    let err = upload_file(&path, &client).await.unwrap_err();
    match err {
        UploadError::Api { status, ref message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid x-api-key");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_unknown_extension_uses_octet_stream() {
    let server = common::start(common::response(
        "200 OK",
        &[("Content-Type", "application/json")],
        br#"{"id":"file_1"}"#,
    ));
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "blob.zzzunknown", "data");

    let client = UploadClient::new("k").unwrap().with_endpoint(&server.base);
    upload_file(&path, &client).await.unwrap();
    let request = server.requests().remove(0).to_ascii_lowercase();
    assert!(
        request.contains("content-type: application/octet-stream"),
        "{request}"
    );
}

//! HTTP backend tests against a mock provider gateway.

use quorum::backend::types::ExtractionRequest;
use quorum::backend::{http::HttpBackend, BackendError, ExtractionBackend};
use quorum::retry::{classify, ErrorClass};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, api_key: Option<&str>) -> HttpBackend {
    HttpBackend::new(
        "claude".to_string(),
        "Claude".to_string(),
        server.uri(),
        api_key.map(String::from),
        Arc::new(Client::new()),
    )
}

fn request() -> ExtractionRequest {
    ExtractionRequest::new("req-1", "Invoice #1234, total due $42.00")
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn parses_successful_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/extract"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": {
                "total": { "value": 42.0, "confidence": 0.95 }
            },
            "confidence": 0.95,
            "completeness": 1.0,
            "validation_passed": true,
            "usage": { "input_tokens": 120, "output_tokens": 30 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Some("secret-key"));
    let result = backend.extract(&request(), TIMEOUT).await.unwrap();

    assert_eq!(result.fields["total"].value, json!(42.0));
    assert!(result.validation_passed);
    assert_eq!(result.usage.input_tokens, 120);
}

#[tokio::test]
async fn rate_limit_carries_retry_after_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/extract"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let backend = backend(&server, None);
    let err = backend.extract(&request(), TIMEOUT).await.unwrap_err();

    match err {
        BackendError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected RateLimited, got {other}"),
    }
}

#[tokio::test]
async fn server_error_classifies_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/extract"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let backend = backend(&server, None);
    let err = backend.extract(&request(), TIMEOUT).await.unwrap_err();

    assert!(matches!(err, BackendError::Upstream { status: 500, .. }));
    assert_eq!(classify(&err), ErrorClass::Transient);
}

#[tokio::test]
async fn auth_rejection_classifies_as_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/extract"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let backend = backend(&server, None);
    let err = backend.extract(&request(), TIMEOUT).await.unwrap_err();

    assert!(matches!(err, BackendError::Auth(_)));
    assert_eq!(classify(&err), ErrorClass::Permanent);
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = backend(&server, None);
    let err = backend.extract(&request(), TIMEOUT).await.unwrap_err();

    assert!(matches!(err, BackendError::InvalidResponse(_)));
}

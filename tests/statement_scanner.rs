//! Statement scanner retry behavior against a mock Gemini endpoint.

#![cfg(feature = "async")]

use serde_json::json;
use wealth_snapshot::error::WealthError;
use wealth_snapshot::models::{AssetClass, Currency};
use wealth_snapshot::retry::RetryPolicy;
use wealth_snapshot::scanner::StatementScanner;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

/// A minimal JPEG header is enough for MIME sniffing.
const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

fn scanner(server: &MockServer, retries: u32) -> StatementScanner {
    StatementScanner::builder()
        .api_key("test-key")
        .model("gemini-test")
        .base_url(server.uri())
        .retry_policy(RetryPolicy::immediate(retries))
        .build()
        .unwrap()
}

fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

const TWO_ASSETS: &str = r#"[
    {"category":"CASH","institution":"HSBC","amount":15000,"currency":"HKD"},
    {"category":"STOCK","institution":"IBKR","symbol":"VOO","amount":3,"currency":"USD","price":512.5}
]"#;

#[tokio::test]
async fn scan_parses_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(answer(TWO_ASSETS))
        .expect(1)
        .mount(&server)
        .await;

    let assets = scanner(&server, 0).scan(&JPEG).await.unwrap();
    assert_eq!(assets.len(), 2);
    let stock = assets.get(1).unwrap();
    assert_eq!(stock.category, AssetClass::Stock);
    assert_eq!(stock.symbol.as_deref(), Some("VOO"));
    assert_eq!(stock.currency, Currency::Usd);
    assert_eq!(stock.price, Some(512.5));
}

#[tokio::test]
async fn request_carries_image_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(answer("[]"))
        .mount(&server)
        .await;

    let assets = scanner(&server, 0).scan_base64("AAAA").await.unwrap();
    assert!(assets.is_empty());

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests.first().unwrap().body_json().unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.first().unwrap()["inlineData"]["mimeType"], json!("image/jpeg"));
    assert_eq!(parts.first().unwrap()["inlineData"]["data"], json!("AAAA"));
}

#[tokio::test]
async fn busy_model_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded."))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(answer(TWO_ASSETS))
        .expect(1)
        .mount(&server)
        .await;

    let assets = scanner(&server, 5).scan(&JPEG).await.unwrap();
    assert_eq!(assets.len(), 2);
}

#[tokio::test]
async fn overloaded_body_is_retried_regardless_of_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(answer(r#"{"assets":[]}"#))
        .mount(&server)
        .await;

    let assets = scanner(&server, 1).scan(&JPEG).await.unwrap();
    assert!(assets.is_empty());
}

#[tokio::test]
async fn exhausted_retries_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .expect(3)
        .mount(&server)
        .await;

    let err = scanner(&server, 2).scan(&JPEG).await.unwrap_err();
    assert!(matches!(err, WealthError::Scan(_)));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad image"))
        .expect(1)
        .mount(&server)
        .await;

    let err = scanner(&server, 5).scan(&JPEG).await.unwrap_err();
    assert!(matches!(err, WealthError::Scan(_)));
}

#[tokio::test]
async fn non_json_answer_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(answer("Sorry, I cannot read this image."))
        .expect(1)
        .mount(&server)
        .await;

    let err = scanner(&server, 5).scan(&JPEG).await.unwrap_err();
    assert!(matches!(err, WealthError::Scan(_)));
}

//! Integration tests for the DexScreener price source
//!
//! The API is served by a local wiremock server, so these run offline.

mod common;

use common::{no_pairs_body, pairs_body, TOKEN_A};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use token_tracker::common::errors::TrackerError;
use token_tracker::common::traits::PriceSource;
use token_tracker::config::types::SourceConfig;
use token_tracker::DexScreenerClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> DexScreenerClient {
    DexScreenerClient::new(&server.uri()).expect("Failed to create client")
}

fn token_path(address: &str) -> String {
    format!("/latest/dex/tokens/{}", address)
}

#[test_log::test(tokio::test)]
async fn test_fetch_snapshot_maps_first_pair() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pairs_body(
            TOKEN_A,
            "0.007123",
            98765.25,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = client_for(&server)
        .await
        .fetch_snapshot(TOKEN_A)
        .await
        .unwrap()
        .expect("snapshot should be present");

    assert_eq!(snapshot.address, TOKEN_A);
    assert_eq!(snapshot.symbol, "SMPL");
    assert_eq!(snapshot.price, dec!(0.007123));
    assert_eq!(snapshot.volume_24h, dec!(98765.25));
    assert_eq!(snapshot.change_24h, dec!(-3.2));
    assert_eq!(snapshot.market_cap, dec!(1234567));
    assert_eq!(snapshot.holder_count, 0);
}

#[tokio::test]
async fn test_unknown_token_is_unavailable_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(ResponseTemplate::new(200).set_body_json(no_pairs_body()))
        .mount(&server)
        .await;

    let result = client_for(&server).await.fetch_snapshot(TOKEN_A).await;
    assert!(matches!(result, Ok(None)), "got {:?}", result);
}

#[tokio::test]
async fn test_empty_pairs_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pairs": [] })))
        .mount(&server)
        .await;

    let result = client_for(&server).await.fetch_snapshot(TOKEN_A).await;
    assert!(matches!(result, Ok(None)));
}

#[tokio::test]
async fn test_server_error_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let result = client_for(&server).await.fetch_snapshot(TOKEN_A).await;
    match result {
        Err(TrackerError::InvalidResponse(message)) => {
            assert!(message.contains("500"), "message was {}", message);
            assert!(message.contains("upstream down"));
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server).await.fetch_snapshot(TOKEN_A).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_sparse_pair_is_defaulted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pairs": [{ "baseToken": { "name": "", "symbol": null } }]
        })))
        .mount(&server)
        .await;

    let snapshot = client_for(&server)
        .await
        .fetch_snapshot(TOKEN_A)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.name, "Unknown");
    assert_eq!(snapshot.symbol, "UNK");
    assert_eq!(snapshot.price, dec!(0));
    assert_eq!(snapshot.volume_24h, dec!(0));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(token_path(TOKEN_A)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(no_pairs_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = DexScreenerClient::from_config(&SourceConfig {
        base_url: server.uri(),
        request_timeout_seconds: 1,
    })
    .unwrap();

    let result = client.fetch_snapshot(TOKEN_A).await;
    assert!(matches!(result, Err(TrackerError::HttpRequest(_))), "got {:?}", result);
}

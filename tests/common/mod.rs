//! Common test utilities and fixtures

#![allow(dead_code)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use token_tracker::common::types::TokenSnapshot;
use tokio::sync::mpsc;

pub const TOKEN_A: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
pub const TOKEN_B: &str = "So11111111111111111111111111111111111111112";

/// Create a sample snapshot for testing
pub fn sample_snapshot(address: &str, price: Decimal) -> TokenSnapshot {
    TokenSnapshot {
        name: "Sample Token".to_string(),
        symbol: "SMPL".to_string(),
        market_cap: price * dec!(1000000000),
        price,
        volume_24h: dec!(125000.50),
        change_24h: dec!(-3.2),
        ..TokenSnapshot::empty(address)
    }
}

/// DexScreener `/latest/dex/tokens/{address}` body with one pair
pub fn pairs_body(address: &str, price: &str, volume: f64) -> Value {
    json!({
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "pair_for_test",
                "baseToken": {
                    "address": address,
                    "name": "Sample Token",
                    "symbol": "SMPL"
                },
                "priceNative": "0.0000071",
                "priceUsd": price,
                "volume": { "m5": 10.0, "h1": 420.5, "h6": 5000, "h24": volume },
                "priceChange": { "m5": 0.1, "h1": -0.4, "h6": 2.5, "h24": -3.2 },
                "marketCap": 1234567,
                "fdv": 1234567
            }
        ]
    })
}

/// Body returned for unknown tokens
pub fn no_pairs_body() -> Value {
    json!({ "schemaVersion": "1.0.0", "pairs": null })
}

/// Drain every queued message without waiting
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(text) = rx.try_recv() {
        if let Ok(value) = serde_json::from_str(&text) {
            messages.push(value);
        }
    }
    messages
}

/// Messages of one event type
pub fn of_type<'a>(messages: &'a [Value], event_type: &str) -> Vec<&'a Value> {
    messages
        .iter()
        .filter(|m| m["type"] == event_type)
        .collect()
}

//! REST client for the DexScreener token endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::messages::TokenPairsResponse;
use crate::common::errors::{Result, TrackerError};
use crate::common::traits::PriceSource;
use crate::common::types::TokenSnapshot;
use crate::config::types::SourceConfig;

/// DexScreener-backed price source
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    /// HTTP client
    client: Client,
    /// Base URL of the API
    base_url: Url,
}

impl DexScreenerClient {
    /// Create a new client with the default 10s timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    /// Create a new client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Internal(e.to_string()))?;

        // Trailing slash so joins append instead of replacing the last segment
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            TrackerError::Configuration(format!("invalid price source url '{}': {}", base_url, e))
        })?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::with_timeout(
            &config.base_url,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Endpoint for one token; the address is encoded as a single path segment
    fn token_url(&self, address: &str) -> Result<Url> {
        if matches!(address.trim(), "" | "." | "..") {
            return Err(TrackerError::Validation(format!(
                "invalid token address '{}'",
                address
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TrackerError::Configuration(format!("price source url '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(["latest", "dex", "tokens"])
            .push(address);
        Ok(url)
    }

    /// Fetch the raw pairs response for a token
    #[instrument(skip(self))]
    pub async fn get_token_pairs(&self, address: &str) -> Result<TokenPairsResponse> {
        let url = self.token_url(address)?;
        debug!("Fetching token pairs from: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::InvalidResponse(format!(
                "DexScreener returned status {}: {}",
                status, body
            )));
        }

        let pairs: TokenPairsResponse = response.json().await?;
        Ok(pairs)
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    async fn fetch_snapshot(&self, address: &str) -> Result<Option<TokenSnapshot>> {
        let response = self.get_token_pairs(address).await?;

        // First listed pair is the most liquid one
        let snapshot = response
            .pairs
            .and_then(|pairs| pairs.into_iter().next())
            .map(|pair| pair.into_snapshot(address));

        if snapshot.is_none() {
            debug!(token = %address, "No pairs listed for token");
        }
        Ok(snapshot)
    }

    fn name(&self) -> &'static str {
        "dexscreener"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DexScreenerClient::new("https://api.dexscreener.com");
        assert!(client.is_ok());
    }

    #[test]
    fn test_url_normalization() {
        let client = DexScreenerClient::new("https://api.dexscreener.com/").unwrap();
        let url = client.token_url("So1111").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.dexscreener.com/latest/dex/tokens/So1111"
        );
    }

    #[test]
    fn test_base_path_is_preserved() {
        let client = DexScreenerClient::new("http://localhost:9000/proxy").unwrap();
        let url = client.token_url("abc").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/proxy/latest/dex/tokens/abc");
    }

    #[test]
    fn test_address_stays_one_path_segment() {
        let client = DexScreenerClient::new("https://api.dexscreener.com").unwrap();

        let url = client.token_url("../../admin").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.dexscreener.com/latest/dex/tokens/..%2F..%2Fadmin"
        );

        let url = client.token_url("abc?x=1#frag").unwrap();
        assert_eq!(url.path(), "/latest/dex/tokens/abc%3Fx=1%23frag");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_dot_segments_rejected() {
        let client = DexScreenerClient::new("https://api.dexscreener.com").unwrap();
        for address in ["", " ", ".", ".."] {
            assert!(matches!(
                client.token_url(address),
                Err(TrackerError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            DexScreenerClient::new("not a url"),
            Err(TrackerError::Configuration(_))
        ));
    }
}

//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Price source configuration
    #[serde(default)]
    pub source: SourceConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Monitor loop timing
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// WebSocket delivery surface
    #[serde(default)]
    pub server: ServerConfig,
    /// Fee treasury wallets
    #[serde(default)]
    pub fees: TreasuryWallets,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// DexScreener price source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the DexScreener API
    #[serde(default = "default_source_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_source_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

/// Database configuration for the snapshot/alert store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout_seconds: default_connection_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:data/token_tracker.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// Monitor loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Pause after each token fetch, throttling the price source
    #[serde(default = "default_token_delay")]
    pub token_delay_ms: u64,
    /// Pause after a full pass over the tracked tokens
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay_ms: u64,
    /// How often an idle loop re-checks the tracked set
    #[serde(default = "default_idle_poll")]
    pub idle_poll_ms: u64,
    /// Upper bound on a single fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
    /// Upper bound on a single store read or write
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    /// Tokens tracked from startup
    #[serde(default)]
    pub initial_tokens: Vec<String>,
}

impl MonitorSettings {
    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            token_delay_ms: default_token_delay(),
            cycle_delay_ms: default_cycle_delay(),
            idle_poll_ms: default_idle_poll(),
            fetch_timeout_ms: default_fetch_timeout(),
            store_timeout_ms: default_store_timeout(),
            initial_tokens: Vec::new(),
        }
    }
}

fn default_token_delay() -> u64 {
    1000
}

fn default_cycle_delay() -> u64 {
    10_000
}

fn default_idle_poll() -> u64 {
    1000
}

fn default_fetch_timeout() -> u64 {
    10_000
}

fn default_store_timeout() -> u64 {
    5_000
}

/// WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Per-connection outbound queue size
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_outbound_buffer() -> usize {
    256
}

/// Wallets receiving each party's share of trading fees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryWallets {
    #[serde(default = "default_protocol_treasury")]
    pub protocol: String,
    #[serde(default = "default_creator_treasury")]
    pub creator: String,
    #[serde(default = "default_lp_treasury")]
    pub lp: String,
}

impl Default for TreasuryWallets {
    fn default() -> Self {
        Self {
            protocol: default_protocol_treasury(),
            creator: default_creator_treasury(),
            lp: default_lp_treasury(),
        }
    }
}

fn default_protocol_treasury() -> String {
    "PROTOCOL_TREASURY_ADDRESS_HERE".to_string()
}

fn default_creator_treasury() -> String {
    "CREATOR_TREASURY_ADDRESS_HERE".to_string()
}

fn default_lp_treasury() -> String {
    "LP_TREASURY_ADDRESS_HERE".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, TrackerError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Treasury wallet variables (`PROTOCOL_TREASURY`, `CREATOR_TREASURY`, `LP_TREASURY`)
/// 2. Environment variables (`APP__SECTION__KEY`)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = apply_treasury_env(builder)?;

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("monitor.initial_tokens")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TrackerError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| TrackerError::Configuration(e.to_string()))
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    load_config(None)
}

fn apply_treasury_env(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    for (var, key) in [
        ("PROTOCOL_TREASURY", "fees.protocol"),
        ("CREATOR_TREASURY", "fees.creator"),
        ("LP_TREASURY", "fees.lp"),
    ] {
        if let Ok(wallet) = std::env::var(var) {
            builder = builder
                .set_override(key, wallet)
                .map_err(|e| TrackerError::Configuration(e.to_string()))?;
        }
    }
    Ok(builder)
}

//! SQLite-backed store
//!
//! Decimal values are stored as TEXT to keep them exact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use crate::common::errors::{Result, TrackerError};
use crate::common::traits::Store;
use crate::common::types::{AlertKind, AlertRule, NewAlertRule, PricePoint, TokenSnapshot};
use crate::config::types::DatabaseConfig;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        address TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        market_cap TEXT NOT NULL,
        price TEXT NOT NULL,
        volume_24h TEXT NOT NULL,
        change_24h TEXT NOT NULL,
        holder_count INTEGER NOT NULL DEFAULT 0,
        captured_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS price_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token_address TEXT NOT NULL,
        price TEXT NOT NULL,
        volume TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token_address TEXT NOT NULL,
        kind TEXT NOT NULL,
        threshold TEXT NOT NULL,
        message TEXT NOT NULL,
        triggered INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_alerts_token ON alerts (token_address, triggered)",
];

/// Store persisted in a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and its tables
    #[instrument(skip(config), fields(url = %config.url))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let path = config.url.strip_prefix("sqlite:").unwrap_or(&config.url);
        let path = path.trim_start_matches("//");
        if !path.starts_with(":memory:") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        TrackerError::Configuration(format!(
                            "failed to create database directory: {}",
                            e
                        ))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        info!("Connected to store at {}", config.url);
        Ok(store)
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| TrackerError::Internal(format!("corrupt decimal in {}: {}", column, e)))
}

fn snapshot_from_row(row: &SqliteRow) -> Result<TokenSnapshot> {
    let holders: i64 = row.try_get("holder_count")?;
    Ok(TokenSnapshot {
        address: row.try_get("address")?,
        name: row.try_get("name")?,
        symbol: row.try_get("symbol")?,
        market_cap: decimal_column(row, "market_cap")?,
        price: decimal_column(row, "price")?,
        volume_24h: decimal_column(row, "volume_24h")?,
        change_24h: decimal_column(row, "change_24h")?,
        holder_count: u64::try_from(holders).unwrap_or_default(),
        captured_at: row.try_get::<DateTime<Utc>, _>("captured_at")?,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<AlertRule> {
    let kind: String = row.try_get("kind")?;
    Ok(AlertRule {
        id: row.try_get("id")?,
        token_address: row.try_get("token_address")?,
        kind: AlertKind::from_str(&kind)?,
        threshold: decimal_column(row, "threshold")?,
        message: row.try_get("message")?,
        triggered: row.try_get("triggered")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_snapshot(&self, snapshot: &TokenSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO tokens
                (address, name, symbol, market_cap, price, volume_24h, change_24h, holder_count, captured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.address)
        .bind(&snapshot.name)
        .bind(&snapshot.symbol)
        .bind(snapshot.market_cap.to_string())
        .bind(snapshot.price.to_string())
        .bind(snapshot.volume_24h.to_string())
        .bind(snapshot.change_24h.to_string())
        .bind(i64::try_from(snapshot.holder_count).unwrap_or(i64::MAX))
        .bind(snapshot.captured_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_history(&self, address: &str, price: Decimal, volume: Decimal) -> Result<()> {
        sqlx::query(
            "INSERT INTO price_history (token_address, price, volume, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(address)
        .bind(price.to_string())
        .bind(volume.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn price_history(&self, address: &str, limit: usize) -> Result<Vec<PricePoint>> {
        let rows = sqlx::query(
            r#"
            SELECT token_address, price, volume, recorded_at FROM price_history
            WHERE token_address = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(address)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PricePoint {
                    address: row.try_get("token_address")?,
                    price: decimal_column(row, "price")?,
                    volume: decimal_column(row, "volume")?,
                    recorded_at: row.try_get::<DateTime<Utc>, _>("recorded_at")?,
                })
            })
            .collect()
    }

    async fn list_alerts(&self, address: &str, triggered: Option<bool>) -> Result<Vec<AlertRule>> {
        let rows = match triggered {
            Some(flag) => {
                sqlx::query("SELECT * FROM alerts WHERE token_address = ? AND triggered = ? ORDER BY id")
                    .bind(address)
                    .bind(flag)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM alerts WHERE token_address = ? ORDER BY id")
                    .bind(address)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(alert_from_row).collect()
    }

    async fn mark_triggered(&self, alert_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE alerts SET triggered = 1 WHERE id = ? AND triggered = 0")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_alert(&self, rule: &NewAlertRule) -> Result<AlertRule> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (token_address, kind, threshold, message, triggered, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&rule.token_address)
        .bind(rule.kind.as_str())
        .bind(rule.threshold.to_string())
        .bind(&rule.message)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(AlertRule {
            id: result.last_insert_rowid(),
            token_address: rule.token_address.clone(),
            kind: rule.kind,
            threshold: rule.threshold,
            message: rule.message.clone(),
            triggered: false,
            created_at,
        })
    }

    async fn list_tokens(&self) -> Result<Vec<TokenSnapshot>> {
        let rows = sqlx::query("SELECT * FROM tokens ORDER BY captured_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(snapshot_from_row).collect()
    }
}

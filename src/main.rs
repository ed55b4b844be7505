//! Token Tracker - Main Entry Point
//!
//! Runs the price monitor and the WebSocket delivery surface, or prints a
//! one-off fee quote.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use token_tracker::config::{load_config, AppConfig};
use token_tracker::fees::{FeeCalculator, TradePhase};
use token_tracker::{
    AlertEvaluator, DexScreenerClient, MonitorLoop, PriceCache, SessionContext, SqliteStore,
    SubscriptionRegistry, TrackedTokens, WebSocketServer,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); defaults to settings.log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Address the WebSocket server binds to
    #[arg(long, env = "BIND_ADDRESS")]
    bind: Option<String>,

    /// Store connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Token address to track from startup (repeatable)
    #[arg(long = "track", value_name = "ADDRESS")]
    track: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fee breakdown for a single trade and exit
    Fees {
        /// Trade size in tokens
        amount: Decimal,
        /// Unit price
        unit_price: Decimal,
        /// bonding or canonical
        #[arg(long, default_value = "canonical")]
        phase: TradePhase,
    },
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(
            builder.with_file(true).with_line_number(true).finish(),
        )?;
    }
    Ok(())
}

fn print_fee_quote(
    config: &AppConfig,
    amount: Decimal,
    unit_price: Decimal,
    phase: TradePhase,
) -> Result<()> {
    let breakdown = FeeCalculator::default().breakdown(amount, unit_price, phase)?;
    let quote = serde_json::json!({
        "breakdown": breakdown,
        "allocations": breakdown.allocations(&config.fees),
    });
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    let mut config =
        load_config(Some(args.config.as_str())).context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_logging(&log_level, args.json_logs)?;

    if let Some(Command::Fees {
        amount,
        unit_price,
        phase,
    }) = args.command
    {
        return print_fee_quote(&config, amount, unit_price, phase);
    }

    info!("Starting token tracker");
    info!("Configuration file: {}", args.config);

    // Store is the only fatal dependency
    let store = Arc::new(
        SqliteStore::connect(&config.database)
            .await
            .context("failed to open store")?,
    );
    let source = Arc::new(
        DexScreenerClient::from_config(&config.source).context("invalid price source config")?,
    );

    let tracked = Arc::new(TrackedTokens::new());
    for address in config.monitor.initial_tokens.iter().chain(args.track.iter()) {
        let address = address.trim();
        if !address.is_empty() {
            tracked.track(address);
        }
    }

    let registry = Arc::new(SubscriptionRegistry::new(tracked));
    let cache = Arc::new(PriceCache::new());

    let (monitor, handle) = MonitorLoop::new(
        source.clone(),
        store.clone(),
        registry.clone(),
        cache.clone(),
        config.monitor.clone(),
    );
    let monitor_task = tokio::spawn(monitor.run());

    let server = Arc::new(WebSocketServer::new(
        SessionContext {
            registry,
            cache,
            evaluator: AlertEvaluator::with_store_timeout(store, config.monitor.store_timeout()),
            source,
            fetch_timeout: config.monitor.fetch_timeout(),
        },
        config.server.clone(),
    ));
    let listener = server.bind().await.context("failed to start WebSocket server")?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_task = tokio::spawn(server.run(listener, shutdown_rx));

    info!("Application initialized successfully");

    // Keep the application running
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");

    handle.stop();
    let _ = shutdown_tx.send(true);

    if let Err(e) = monitor_task.await {
        error!("Monitor task failed: {}", e);
    }
    match server_task.await {
        Ok(Err(e)) => error!("WebSocket server failed: {}", e),
        Err(e) => error!("WebSocket server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    Ok(())
}

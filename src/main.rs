//! Bot traffic analytics server.

use anyhow::Result;
use bot_traffic_analytics::{server, AnalyticsConfig, BotAnalysisService, MemoryVisitStore};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bot-traffic-analytics")]
#[command(author, version, about = "Visit analytics with bot traffic detection")]
struct Args {
    /// Address for the HTTP server
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Path to configuration file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file with visits to load at startup
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

fn load_config(path: &Path) -> Result<AnalyticsConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, &args.log_level);

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AnalyticsConfig::default(),
    };

    let store = match &args.seed {
        Some(path) => MemoryVisitStore::from_json_file(path, config.store.max_records)?,
        None => MemoryVisitStore::new(config.store.max_records),
    };

    let purge_interval = Duration::from_secs(config.store.purge_interval_seconds.max(1));
    let service = Arc::new(BotAnalysisService::new(config, Arc::new(store))?);

    let purger = Arc::clone(&service);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = purger.purge_expired().await {
                warn!(error = %e, "Retention pass failed");
            }
        }
    });

    let app = server::router(service);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;

    info!(address = %args.bind, "Bot traffic analytics listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

//! queuewarden - reaction-driven queue coordination engine.
//!
//! Replays a newline-delimited JSON event stream against an in-memory
//! platform and keeps running so reclamation and activity timers can fire.

use clap::Parser;
use queuewarden::config::{Config, LogFormat, validation};
use queuewarden::platform::MemoryPlatform;
use queuewarden::{Engine, http, metrics, replay};
use queuewarden_proto::MemberId;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "queuewarden")]
#[command(about = "Reaction-driven queue coordination engine")]
#[command(version)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Newline-delimited JSON event stream; stdin when omitted
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Log filter overriding RUST_LOG (e.g. "debug" or "queuewarden=trace")
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn init_tracing(format: LogFormat, level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| {
            eprintln!("failed to load config {}: {e}", path.display());
            e
        })?,
        None => Config::default(),
    };

    init_tracing(config.server.log_format, args.log_level.as_deref());

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration rejected ({} problems)", errors.len());
    }

    info!(
        active_window_secs = config.timing.active_window_secs,
        clean_after_secs = config.timing.clean_after_secs,
        queue_prefix = %config.queue.queue_prefix,
        "Starting queuewarden"
    );

    let platform = Arc::new(MemoryPlatform::new(MemberId(config.server.self_id)));
    let engine = Engine::new(platform.clone(), &config);

    if let Some(port) = config.server.metrics_port {
        metrics::init();
        info!("Metrics initialized");
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            http::run_http_server(port, engine).await;
        });
    } else {
        info!("Metrics disabled");
    }

    let stats = match &args.events {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            replay::run(&engine, &platform, BufReader::new(file)).await?
        }
        None => replay::run(&engine, &platform, BufReader::new(tokio::io::stdin())).await?,
    };
    if stats.failed > 0 || stats.malformed > 0 {
        warn!(
            failed = stats.failed,
            malformed = stats.malformed,
            "some events were not applied"
        );
    }

    // Timers keep running after the stream ends.
    info!("Waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

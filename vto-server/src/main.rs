//! vto-server - Virtual try-on relay
//!
//! Receives chat webhooks, collects a person image and a garment image per
//! sender, runs them through the synthesis service and replies via the
//! messaging API.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vto_core::{HttpSynthesizer, InMemorySessionStore, TwilioNotifier};

mod config;
mod executor;
mod relay;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use config::{Config, ExecutionMode};
use state::AppState;

/// How long shutdown waits for queued jobs to finish
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_LOG_FILTER: &str = "vto_server=info,vto_core=info";

/// Virtual try-on webhook relay
#[derive(Parser, Debug)]
#[command(name = "vto-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Listen address (overrides VTO_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Synthesis execution strategy (overrides VTO_MODE)
    #[arg(long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Emit logs as JSON lines
    #[arg(long, env = "VTO_LOG_JSON")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Seed the environment from .env before anything reads it
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!("vto-server v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        info!("Environment loaded from {:?}", path);
    }

    // Load configuration
    let mut config = Config::load()?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Credentials not configured; outbound calls will fail");
    }

    // External services
    let synthesizer = Arc::new(HttpSynthesizer::new(config.synthesis.clone())?);
    let notifier = Arc::new(TwilioNotifier::new(config.twilio.clone())?);
    info!(url = %synthesizer.url(), "Synthesis endpoint configured");

    // Sessions
    let sessions = Arc::new(InMemorySessionStore::new(config.sessions.clone()));
    let pruner = Arc::clone(&sessions).spawn_pruner();

    let bind = config.bind;
    let mode = config.mode;
    let (state, workers) = AppState::new(config, sessions, synthesizer, notifier);

    // Results expire on their own schedule
    let results = Arc::clone(&state.results);
    let result_pruner = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let removed = results.prune_expired().await;
            if removed > 0 {
                info!(removed = removed, "Pruned expired results");
            }
        }
    });

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, mode = %mode, "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    pruner.abort();
    result_pruner.abort();

    // The router (and with it every queue handle) is gone, so workers finish
    // whatever is left and exit
    if let Some(workers) = workers {
        info!(workers = workers.len(), "Draining job queue");
        if tokio::time::timeout(DRAIN_TIMEOUT, workers.join()).await.is_err() {
            warn!("Job queue did not drain in time");
        }
    }

    Ok(())
}

/// Log filter from `RUST_LOG`, falling back to info for both crates when it
/// is unset or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod handlers;
mod middleware;
mod server;
mod simulator;
mod stats;

use aggregate::SessionRegistry;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// All sessions seen so far; handlers feed and query it.
    pub registry: Arc<SessionRegistry>,

    /// Tick of the per-session SSE feed.
    pub stream_interval: Duration,
}

/// Tick of the synthetic observers started by `--simulate`.
const SIMULATOR_TICK: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = config::Args::parse();
    let aggregator = args.aggregator_config();
    info!(
        bind = %args.bind,
        observers = aggregator.observers,
        smoothing = aggregator.smoothing,
        flush_threshold = aggregator.flush_threshold,
        idle_ttl = ?aggregator.idle_ttl,
        "starting rtt aggregator"
    );

    // ── 1. Build shared state ────────────────────────────────────
    let registry = Arc::new(SessionRegistry::new(aggregator));
    let state = Arc::new(AppState {
        registry: registry.clone(),
        stream_interval: args.stream_interval(),
    });

    // ── 2. Background tasks ──────────────────────────────────────
    let evictor = tokio::spawn(evict_loop(registry.clone(), args.evict_interval()));

    let sim_running = Arc::new(AtomicBool::new(args.simulate > 0));
    let simulator = (args.simulate > 0).then(|| {
        tokio::spawn(simulator::run(
            registry.clone(),
            sim_running.clone(),
            args.simulate,
            SIMULATOR_TICK,
        ))
    });

    // ── 3. Router, bind & serve ──────────────────────────────────
    let app = server::create_router(state, args.static_dir.clone());
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    info!(
        ingest = %format!("http://{}/data/<observer>", args.bind),
        sessions = %format!("http://{}/demo", args.bind),
        "server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    // ── 4. Teardown ──────────────────────────────────────────────
    sim_running.store(false, Ordering::SeqCst);
    if let Some(handle) = simulator {
        let _ = handle.await;
    }
    evictor.abort();
    info!(sessions = registry.len(), "shutting down");
    Ok(())
}

async fn evict_loop(registry: Arc<SessionRegistry>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let evicted = registry.evict_idle(Instant::now());
        if evicted > 0 {
            info!(evicted, remaining = registry.len(), "evicted idle sessions");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("interrupt received");
}

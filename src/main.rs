//! Order book feed - binary entry point
//!
//! Connects to the configured feed, keeps the book in sync and serves the top of
//! book over HTTP until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orderbook_feed::server::{self, AppState};
use orderbook_feed::{BookEngine, BookReader, Config, FeedHealth};

/// Interval between top-of-book status lines
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting order book feed");

    let config = Config::load()?;
    info!(
        endpoint = %config.endpoint,
        topic = %config.topic,
        depth = config.depth,
        max_backoff_ms = config.max_backoff_ms,
        "Configuration loaded"
    );
    let addr: SocketAddr = config.http_addr.parse()?;

    let mut engine = BookEngine::new(config)?;
    engine.start()?;

    let state = Arc::new(AppState {
        reader: engine.reader(),
        metrics: engine.metrics().clone(),
    });

    let status_task = tokio::spawn(log_status(engine.reader()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting HTTP server");
    let served = axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = served {
        warn!(error = %e, "HTTP server error");
    }

    status_task.abort();
    engine.stop().await;
    info!("Order book feed stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Periodically log the best levels, as a minimal display consumer
async fn log_status(reader: BookReader) {
    let mut ticker = interval(STATUS_LOG_INTERVAL);
    loop {
        ticker.tick().await;
        let view = reader.view().await;
        match view.health {
            FeedHealth::Live => info!(
                topic = %view.topic,
                last_seq = ?view.last_seq,
                best_bid = ?view.bids.first().map(|l| l.price),
                best_ask = ?view.asks.last().map(|l| l.price),
                bid_levels = view.bids.len(),
                ask_levels = view.asks.len(),
                "Order book status"
            ),
            health => warn!(topic = %view.topic, health = ?health, "Order book not live"),
        }
    }
}

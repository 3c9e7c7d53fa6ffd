//! Book engine
//!
//! Wires one [`FeedConnection`] to one [`OrderBook`]. A single writer task
//! applies events in arrival order; readers share the book behind a
//! read/write lock and never observe a half-applied event.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::metrics::FeedMetrics;
use crate::orderbook::{
    ApplyOutcome, BookView, FeedHealth, OrderBook, PriceLevel, SharedBook, Side, TopOfBookView,
};
use crate::parser::FeedEvent;
use crate::websocket::{ConnectionStatus, FeedConnection, Resubscriber};

/// Signal raised by the writer when the book needs a fresh snapshot
#[cfg_attr(test, mockall::automock)]
pub trait ResubscribeSignal {
    fn resubscribe(&self);
}

impl ResubscribeSignal for Resubscriber {
    fn resubscribe(&self) {
        Resubscriber::resubscribe(self);
    }
}

/// Single writer applying feed events to the shared book
pub struct BookWriter<R> {
    book: SharedBook,
    resubscribe: R,
    metrics: FeedMetrics,
}

impl<R: ResubscribeSignal> BookWriter<R> {
    pub fn new(book: SharedBook, resubscribe: R, metrics: FeedMetrics) -> Self {
        Self {
            book,
            resubscribe,
            metrics,
        }
    }

    /// Apply one event under the write lock
    pub async fn handle(&self, event: &FeedEvent) -> ApplyOutcome {
        let outcome = {
            let mut book = self.book.write().await;
            book.apply(event)
        };

        self.metrics.record(event, outcome);

        if let ApplyOutcome::GapDetected { expected, received } = outcome {
            info!(expected, received, "Requesting resubscribe after sequence gap");
            self.resubscribe.resubscribe();
        }

        outcome
    }

    /// Consume events until the transport side closes the channel
    pub async fn run(self, mut events: mpsc::Receiver<FeedEvent>) {
        while let Some(event) = events.recv().await {
            debug!(kind = event.kind(), "Applying feed event");
            self.handle(&event).await;
        }
        debug!("Event stream ended, book writer exiting");
    }
}

/// Read-only access for the display layer
#[derive(Clone)]
pub struct BookReader {
    book: SharedBook,
    status: watch::Receiver<ConnectionStatus>,
    depth: usize,
    stale_after: Duration,
}

impl BookReader {
    pub fn new(
        book: SharedBook,
        status: watch::Receiver<ConnectionStatus>,
        depth: usize,
        stale_after: Duration,
    ) -> Self {
        Self {
            book,
            status,
            depth,
            stale_after,
        }
    }

    /// Up to `n` best levels of `side`, price descending
    pub async fn best_levels(&self, side: Side, n: usize) -> Vec<PriceLevel> {
        let book = self.book.read().await;
        TopOfBookView::best_levels(&book, side, n)
    }

    /// Both sides at the configured depth, captured atomically
    pub async fn view(&self) -> BookView {
        self.view_with_depth(self.depth).await
    }

    pub async fn view_with_depth(&self, depth: usize) -> BookView {
        let connection = self.connection_status();
        let book = self.book.read().await;
        TopOfBookView::capture(&book, depth, connection, self.stale_after)
    }

    pub async fn health(&self) -> FeedHealth {
        let connection = self.connection_status();
        let book = self.book.read().await;
        FeedHealth::assess(&book, connection, self.stale_after, chrono::Utc::now())
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// One instrument's book plus the connection feeding it
pub struct BookEngine {
    config: Arc<Config>,
    book: SharedBook,
    metrics: FeedMetrics,
    connection: FeedConnection,
    writer: Option<JoinHandle<()>>,
}

impl BookEngine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let metrics = FeedMetrics::new()?;
        let book = Arc::new(RwLock::new(OrderBook::new(&config.topic)));
        let connection = FeedConnection::new(config.clone(), metrics.clone());

        Ok(Self {
            config,
            book,
            metrics,
            connection,
            writer: None,
        })
    }

    /// Start the transport and the book writer
    pub fn start(&mut self) -> Result<()> {
        if self.writer.as_ref().is_some_and(|writer| !writer.is_finished()) {
            return Err(FeedError::AlreadyRunning);
        }

        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer);
        self.connection.start(events_tx)?;

        let writer = BookWriter::new(
            self.book.clone(),
            self.connection.resubscriber(),
            self.metrics.clone(),
        );
        self.writer = Some(tokio::spawn(writer.run(events_rx)));

        info!(
            endpoint = %self.config.endpoint,
            topic = %self.config.topic,
            "Book engine started"
        );
        Ok(())
    }

    /// Stop the transport, then let the writer drain what was already received
    pub async fn stop(&mut self) {
        self.connection.stop().await;
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                warn!(error = %e, "Book writer task failed");
            }
            info!(topic = %self.config.topic, "Book engine stopped");
        }
    }

    pub fn reader(&self) -> BookReader {
        BookReader::new(
            self.book.clone(),
            self.connection.status(),
            self.config.depth,
            self.config.stale_after(),
        )
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

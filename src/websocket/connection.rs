//! Feed connection lifecycle
//!
//! Runs the transport as one background task that turns WebSocket frames into
//! an ordered stream of [`FeedEvent`]s, reconnecting with capped exponential
//! backoff until `stop()` is called.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::{ConnectionStatus, WebSocketClient};
use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::metrics::FeedMetrics;
use crate::parser::{self, FeedEvent};

/// Delay before reconnect attempt `attempt` (1-based): `initial * 2^(attempt-1)`, capped at `max`
pub fn backoff_delay(initial: Duration, max: Duration, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32 << (attempt - 1).min(31);
    initial.checked_mul(factor).map_or(max, |delay| delay.min(max))
}

/// Handle used by the book writer to ask the live session for a fresh snapshot
#[derive(Debug, Clone)]
pub struct Resubscriber {
    notify: Arc<Notify>,
}

impl Resubscriber {
    /// Request unsubscribe + subscribe on the current session.
    ///
    /// Requests made while no session is open are served by the next one.
    pub fn resubscribe(&self) {
        self.notify.notify_one();
    }
}

/// Owns the transport session task
pub struct FeedConnection {
    config: Arc<Config>,
    metrics: FeedMetrics,
    status: Arc<watch::Sender<ConnectionStatus>>,
    resubscribe: Arc<Notify>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl FeedConnection {
    pub fn new(config: Arc<Config>, metrics: FeedMetrics) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            config,
            metrics,
            status: Arc::new(status),
            resubscribe: Arc::new(Notify::new()),
            shutdown: None,
            task: None,
        }
    }

    /// Spawn the session task; events are delivered to `events` in arrival order.
    ///
    /// The stream ends when `stop()` is called or `events` is closed. A stopped
    /// connection can be started again.
    pub fn start(&mut self, events: mpsc::Sender<FeedEvent>) -> Result<()> {
        if self.is_running() {
            return Err(FeedError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.status.send_replace(ConnectionStatus::Connecting);

        let session = SessionLoop {
            client: WebSocketClient::new(&self.config.endpoint, &self.config.topic),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            status: self.status.clone(),
            resubscribe: self.resubscribe.clone(),
            shutdown: shutdown_rx,
            events,
        };

        self.task = Some(tokio::spawn(session.run()));
        self.shutdown = Some(shutdown_tx);
        Ok(())
    }

    /// Close the session and cancel any backoff wait. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Feed session task failed");
            }
        }
        let started = *self.status.borrow() != ConnectionStatus::Idle;
        if started {
            self.status.send_replace(ConnectionStatus::Stopped);
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn resubscriber(&self) -> Resubscriber {
        Resubscriber {
            notify: self.resubscribe.clone(),
        }
    }

    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }
}

/// Why a session ended without a transport error
enum SessionEnd {
    Shutdown,
    ConsumerGone,
}

/// State moved into the background task
struct SessionLoop {
    client: WebSocketClient,
    config: Arc<Config>,
    metrics: FeedMetrics,
    status: Arc<watch::Sender<ConnectionStatus>>,
    resubscribe: Arc<Notify>,
    shutdown: watch::Receiver<bool>,
    events: mpsc::Sender<FeedEvent>,
}

impl SessionLoop {
    async fn run(mut self) {
        info!(topic = %self.config.topic, "Starting feed connection");
        let mut attempt: u32 = 0;

        loop {
            let mut opened = false;
            let result = self.run_session(&mut opened, &mut attempt).await;

            self.client.close().await;
            self.metrics.connected.set(0);

            if opened && self.events.send(FeedEvent::ConnectionClosed).await.is_err() {
                break;
            }

            match result {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::ConsumerGone) => {
                    debug!("Event consumer dropped, ending feed connection");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Feed session lost");
                    self.metrics.reconnects.inc();
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = backoff_delay(
                self.config.initial_backoff(),
                self.config.max_backoff(),
                attempt,
            );
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            self.status
                .send_replace(ConnectionStatus::Reconnecting { attempt, delay_ms });
            warn!(attempt, delay_ms, "Reconnecting after backoff");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.status.send_replace(ConnectionStatus::Stopped);
        info!(topic = %self.config.topic, "Feed connection stopped");
    }

    /// Connect, subscribe and pump frames until shutdown or a transport error
    async fn run_session(&mut self, opened: &mut bool, attempt: &mut u32) -> Result<SessionEnd> {
        if *self.shutdown.borrow() {
            return Ok(SessionEnd::Shutdown);
        }

        tokio::select! {
            biased;
            _ = self.shutdown.changed() => return Ok(SessionEnd::Shutdown),
            connected = self.client.connect() => connected?,
        }

        *opened = true;
        if self.events.send(FeedEvent::ConnectionOpened).await.is_err() {
            return Ok(SessionEnd::ConsumerGone);
        }

        self.client.subscribe().await?;
        self.status.send_replace(ConnectionStatus::Connected);
        self.metrics.connected.set(1);

        let recv_timeout = self.config.recv_timeout();
        let mut last_message = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => return Ok(SessionEnd::Shutdown),
                _ = self.resubscribe.notified() => {
                    info!(topic = %self.config.topic, "Resubscribing for a fresh snapshot");
                    self.client.resubscribe().await?;
                }
                received = timeout(recv_timeout, self.client.recv()) => match received {
                    Ok(Ok(Some(text))) => {
                        last_message = Instant::now();
                        self.metrics.messages_received.inc();
                        match parser::decode(&text) {
                            Ok(Some(event)) => {
                                *attempt = 0;
                                if self.events.send(event).await.is_err() {
                                    return Ok(SessionEnd::ConsumerGone);
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                self.metrics.decode_errors.inc();
                                warn!(error = %e, "Dropping undecodable message");
                            }
                        }
                    }
                    // Ping/pong or other non-data frame
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        warn!(
                            last_message_secs = last_message.elapsed().as_secs(),
                            "No message received within timeout, sending keepalive"
                        );
                        if let Err(e) = self.client.ping().await {
                            warn!(error = %e, "Failed to send keepalive ping, reconnecting");
                            return Err(FeedError::ConnectionTimeout);
                        }
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let initial = Duration::from_millis(500);
        let max = Duration::from_secs(30);

        assert_eq!(backoff_delay(initial, max, 0), Duration::ZERO);
        assert_eq!(backoff_delay(initial, max, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(initial, max, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(initial, max, 4), Duration::from_secs(4));
        assert_eq!(backoff_delay(initial, max, 7), Duration::from_secs(30));
        assert_eq!(backoff_delay(initial, max, u32::MAX), max);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_without_start() {
        let config = Arc::new(Config::new("ws://127.0.0.1:1", "update:BTCPFC"));
        let mut connection = FeedConnection::new(config, FeedMetrics::new().unwrap());
        connection.stop().await;
        connection.stop().await;
        assert_eq!(*connection.status().borrow(), ConnectionStatus::Idle);
        assert!(!connection.is_running());
    }

    #[tokio::test]
    async fn test_stop_cancels_backoff() {
        let mut config = Config::new("ws://127.0.0.1:1", "update:BTCPFC");
        config.initial_backoff_ms = 60_000;
        config.max_backoff_ms = 60_000;
        let mut connection = FeedConnection::new(Arc::new(config), FeedMetrics::new().unwrap());
        let mut status = connection.status();

        let (tx, _rx) = mpsc::channel(16);
        connection.start(tx).unwrap();
        assert!(matches!(
            connection.start(mpsc::channel(1).0),
            Err(FeedError::AlreadyRunning)
        ));

        // nothing listens on port 1, so the first attempt fails into a long backoff
        tokio::time::timeout(Duration::from_secs(5), async {
            while !matches!(*status.borrow_and_update(), ConnectionStatus::Reconnecting { .. }) {
                status.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        tokio::time::timeout(Duration::from_secs(1), connection.stop())
            .await
            .unwrap();
        assert_eq!(*connection.status().borrow(), ConnectionStatus::Stopped);
        assert!(!connection.is_running());
    }
}

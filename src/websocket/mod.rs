//! WebSocket module for feed connection management

mod client;
mod connection;

pub use client::WebSocketClient;
pub use connection::{backoff_delay, FeedConnection, Resubscriber};

use serde::Serialize;

/// Transport session state, published on a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not started
    Idle,
    /// Opening the first session
    Connecting,
    /// Session open and subscribed
    Connected,
    /// Session lost; waiting `delay_ms` before attempt number `attempt`
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// `stop()` completed
    Stopped,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

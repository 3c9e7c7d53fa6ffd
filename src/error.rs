//! Error types for the order book feed

use thiserror::Error;

/// Order book feed errors
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    #[error("WebSocket message error: {0}")]
    WebSocketMessage(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Feed connection is already running")]
    AlreadyRunning,

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::WebSocketConnection(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl From<::config::ConfigError> for FeedError {
    fn from(err: ::config::ConfigError) -> Self {
        FeedError::ConfigError(err.to_string())
    }
}

impl From<prometheus::Error> for FeedError {
    fn from(err: prometheus::Error) -> Self {
        FeedError::MetricsError(err.to_string())
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

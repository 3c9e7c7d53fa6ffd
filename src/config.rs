//! Configuration module for the order book feed
//!
//! Values are layered: an optional config file, then `BOOK_FEED_*` environment
//! variables, which win over the file.
//!
//! `endpoint` and `topic` are required. Everything else has a default:
//!
//! | key                  | default        |
//! |----------------------|----------------|
//! | `depth`              | 8              |
//! | `initial_backoff_ms` | 500            |
//! | `max_backoff_ms`     | 30000          |
//! | `recv_timeout_secs`  | 30             |
//! | `stale_after_secs`   | 10             |
//! | `event_buffer`       | 1024           |
//! | `http_addr`          | `0.0.0.0:9090` |

use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::{FeedError, Result};

/// Prefix for environment overrides (`BOOK_FEED_TOPIC`, `BOOK_FEED_MAX_BACKOFF_MS`, ...)
const ENV_PREFIX: &str = "BOOK_FEED";

/// Default reconnect backoff ceiling in milliseconds
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Application configuration; see the module docs for defaults
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// WebSocket endpoint (e.g. "wss://ws.btse.com/ws/oss/futures")
    pub endpoint: String,

    /// Topic naming the instrument's book stream (e.g. "update:BTCPFC")
    pub topic: String,

    /// Levels per side served by the top-of-book view
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// First reconnect delay; doubles per failed attempt
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Reconnect delay ceiling
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Silence after which a keepalive ping is sent
    #[serde(default = "default_recv_timeout_secs")]
    pub recv_timeout_secs: u64,

    /// Age of the last book update after which the view reports stale data
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Capacity of the transport -> book event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Bind address for the health/book HTTP server
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
}

fn default_depth() -> usize {
    8
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

fn default_recv_timeout_secs() -> u64 {
    30
}

fn default_stale_after_secs() -> u64 {
    10
}

fn default_event_buffer() -> usize {
    1024
}

fn default_http_addr() -> String {
    "0.0.0.0:9090".to_string()
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Reads `.env` if present, then the file named by `BOOK_FEED_CONFIG`
    /// (or `book-feed.{toml,json,yaml}` in the working directory), then
    /// `BOOK_FEED_*` variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match env::var(format!("{ENV_PREFIX}_CONFIG")) {
            Ok(path) => ::config::File::with_name(&path).required(true),
            Err(_) => ::config::File::with_name("book-feed").required(false),
        };

        Self::build(::config::Config::builder().add_source(file))
    }

    /// Load configuration from an explicit file, still honouring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = ::config::File::from(path.as_ref()).required(true);
        Self::build(::config::Config::builder().add_source(file))
    }

    fn build(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self> {
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the feed cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(FeedError::ConfigError(format!(
                "endpoint must be a ws:// or wss:// URL, got {:?}",
                self.endpoint
            )));
        }
        if self.topic.trim().is_empty() {
            return Err(FeedError::ConfigError("topic must not be empty".to_string()));
        }
        if self.depth == 0 {
            return Err(FeedError::ConfigError("depth must be at least 1".to_string()));
        }
        if self.initial_backoff_ms == 0 {
            return Err(FeedError::ConfigError(
                "initial_backoff_ms must be positive".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(FeedError::ConfigError(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        if self.recv_timeout_secs == 0 {
            return Err(FeedError::ConfigError(
                "recv_timeout_secs must be positive".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(FeedError::ConfigError("event_buffer must be positive".to_string()));
        }
        Ok(())
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_secs(self.recv_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Configuration with every optional value at its default
    pub fn new(endpoint: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            topic: topic.into(),
            depth: default_depth(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            recv_timeout_secs: default_recv_timeout_secs(),
            stale_after_secs: default_stale_after_secs(),
            event_buffer: default_event_buffer(),
            http_addr: default_http_addr(),
        }
    }
}

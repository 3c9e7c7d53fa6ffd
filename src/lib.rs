//! Order book feed
//!
//! Maintains an always-consistent price-level order book for one instrument
//! from a WebSocket feed that sends a snapshot followed by sequenced deltas.

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod orderbook;
pub mod parser;
pub mod server;
pub mod websocket;

pub use crate::config::Config;
pub use crate::engine::{BookEngine, BookReader, BookWriter, ResubscribeSignal};
pub use crate::error::{FeedError, Result};
pub use crate::metrics::FeedMetrics;
pub use crate::orderbook::{
    ApplyOutcome, BookSide, BookView, FeedHealth, OrderBook, PriceLevel, PriceLevelMap, Side,
    SyncState, TopOfBookView,
};
pub use crate::parser::{BookDelta, BookSnapshot, FeedEvent};
pub use crate::websocket::{ConnectionStatus, FeedConnection, Resubscriber};

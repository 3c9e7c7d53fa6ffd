//! Order book module
//!
//! Reconstructs a price-level book from a snapshot followed by sequenced deltas.

mod book;
mod level_map;
mod side;
mod view;

pub use book::{ApplyOutcome, OrderBook, SyncState};
pub use level_map::PriceLevelMap;
pub use side::BookSide;
pub use view::{BookView, FeedHealth, TopOfBookView};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

/// A single level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Book shared between the single writer task and any number of readers.
///
/// The writer holds the write guard for exactly one event, so readers never see
/// a partially applied snapshot or delta.
pub type SharedBook = Arc<RwLock<OrderBook>>;

//! Read-only top-of-book derivation for display

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::{OrderBook, PriceLevel, Side, SyncState};
use crate::websocket::ConnectionStatus;

/// Pure derivations over an [`OrderBook`]
pub struct TopOfBookView;

impl TopOfBookView {
    /// The `n` best levels of `side`, in display order (price descending).
    ///
    /// Selection takes the economically best levels (highest bids, lowest
    /// asks); both sides are then listed high to low, so the ask ladder ends
    /// on the best ask and the bid ladder starts on the best bid.
    pub fn best_levels(book: &OrderBook, side: Side, n: usize) -> Vec<PriceLevel> {
        let mut levels = book.side(side).best_n(n);
        if side == Side::Ask {
            levels.reverse();
        }
        levels
    }

    /// Capture both sides and the sync state from one borrow of the book
    pub fn capture(
        book: &OrderBook,
        depth: usize,
        connection: ConnectionStatus,
        stale_after: Duration,
    ) -> BookView {
        BookView {
            topic: book.topic().to_string(),
            state: book.state(),
            health: FeedHealth::assess(book, connection, stale_after, Utc::now()),
            last_seq: book.last_seq(),
            last_update: book.last_update(),
            bids: Self::best_levels(book, Side::Bid, depth),
            asks: Self::best_levels(book, Side::Ask, depth),
        }
    }
}

/// What the display layer should tell the user about the data it shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedHealth {
    /// First connection attempt in progress
    Connecting,
    /// Session lost, waiting to reconnect
    Reconnecting,
    /// Connected, waiting for a snapshot
    Syncing,
    /// Book is synced and recently updated
    Live,
    /// Book is synced but nothing arrived within the stale window
    Stale,
    /// Feed was stopped
    Stopped,
}

impl FeedHealth {
    pub fn assess(
        book: &OrderBook,
        connection: ConnectionStatus,
        stale_after: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        match connection {
            ConnectionStatus::Idle | ConnectionStatus::Connecting => return FeedHealth::Connecting,
            ConnectionStatus::Reconnecting { .. } => return FeedHealth::Reconnecting,
            ConnectionStatus::Stopped => return FeedHealth::Stopped,
            ConnectionStatus::Connected => {}
        }

        match (book.state(), book.last_update()) {
            (SyncState::Synced { .. }, Some(at)) => {
                let age = now.signed_duration_since(at).to_std().unwrap_or_default();
                if age > stale_after {
                    FeedHealth::Stale
                } else {
                    FeedHealth::Live
                }
            }
            _ => FeedHealth::Syncing,
        }
    }
}

/// Consistent snapshot of the top of book served to the display layer
#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    pub topic: String,
    pub state: SyncState,
    pub health: FeedHealth,
    pub last_seq: Option<u64>,
    pub last_update: Option<DateTime<Utc>>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

//! Core order book implementation
//!
//! Tracks sequence continuity so deltas are only ever applied on top of the
//! exact state they were generated against.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{BookSide, PriceLevel, Side};
use crate::parser::{BookDelta, BookSnapshot, FeedEvent};

/// Sequencing state of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// No snapshot applied since creation or the last reset
    Uninitialized,
    /// Book reflects the feed up to `last_seq`
    Synced { last_seq: u64 },
    /// A delta with `prevSeqNum == received` did not chain onto `last_seq`;
    /// waiting for a fresh snapshot
    Desynced { last_seq: u64, received: u64 },
}

/// Result of applying one [`FeedEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Book state changed
    Applied,
    /// Event was dropped without touching the book
    Discarded,
    /// Delta broke sequence continuity; the book was discarded and needs a
    /// fresh snapshot
    GapDetected { expected: u64, received: u64 },
}

/// Order book for a single instrument
#[derive(Debug, Clone)]
pub struct OrderBook {
    topic: String,
    bids: BookSide,
    asks: BookSide,
    state: SyncState,
    /// Wall-clock time of the last applied snapshot or delta
    last_update: Option<DateTime<Utc>>,
}

impl OrderBook {
    /// Create a new empty, uninitialized order book
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
            state: SyncState::Uninitialized,
            last_update: None,
        }
    }

    /// Apply one feed event
    pub fn apply(&mut self, event: &FeedEvent) -> ApplyOutcome {
        match event {
            FeedEvent::Snapshot(snapshot) => self.on_snapshot(snapshot),
            FeedEvent::Delta(delta) => self.on_delta(delta),
            FeedEvent::ConnectionOpened | FeedEvent::ConnectionClosed => {
                self.reset();
                ApplyOutcome::Applied
            }
        }
    }

    /// Replace both sides wholesale; valid from any state
    pub fn on_snapshot(&mut self, snapshot: &BookSnapshot) -> ApplyOutcome {
        let previous = self.state;

        self.bids.replace_all(&snapshot.bids);
        self.asks.replace_all(&snapshot.asks);
        self.state = SyncState::Synced {
            last_seq: snapshot.seq_num,
        };
        self.last_update = Some(Utc::now());

        if !matches!(previous, SyncState::Synced { .. }) {
            info!(
                topic = %self.topic,
                seq_num = snapshot.seq_num,
                bid_levels = self.bids.level_count(),
                ask_levels = self.asks.level_count(),
                "Order book synced from snapshot"
            );
        } else {
            debug!(topic = %self.topic, seq_num = snapshot.seq_num, "Snapshot replaced book");
        }

        ApplyOutcome::Applied
    }

    /// Apply a delta if it chains onto the last applied sequence number
    pub fn on_delta(&mut self, delta: &BookDelta) -> ApplyOutcome {
        match self.state {
            SyncState::Uninitialized => {
                warn!(
                    topic = %self.topic,
                    seq_num = delta.seq_num,
                    "Delta received before snapshot, discarding"
                );
                ApplyOutcome::Discarded
            }
            SyncState::Desynced { .. } => {
                debug!(
                    topic = %self.topic,
                    seq_num = delta.seq_num,
                    "Delta received while desynced, discarding"
                );
                ApplyOutcome::Discarded
            }
            SyncState::Synced { last_seq } if delta.prev_seq_num != last_seq => {
                warn!(
                    topic = %self.topic,
                    expected = last_seq,
                    received = delta.prev_seq_num,
                    seq_num = delta.seq_num,
                    "Sequence gap detected, discarding book"
                );
                self.bids.clear();
                self.asks.clear();
                self.state = SyncState::Desynced {
                    last_seq,
                    received: delta.prev_seq_num,
                };
                ApplyOutcome::GapDetected {
                    expected: last_seq,
                    received: delta.prev_seq_num,
                }
            }
            SyncState::Synced { .. } => {
                self.bids.apply_delta(&delta.bids);
                self.asks.apply_delta(&delta.asks);
                self.state = SyncState::Synced {
                    last_seq: delta.seq_num,
                };
                self.last_update = Some(Utc::now());
                ApplyOutcome::Applied
            }
        }
    }

    /// Drop all levels and return to `Uninitialized`
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.state = SyncState::Uninitialized;
        self.last_update = None;
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        matches!(self.state, SyncState::Synced { .. })
    }

    /// Sequence number of the last applied snapshot or delta
    pub fn last_seq(&self) -> Option<u64> {
        match self.state {
            SyncState::Uninitialized => None,
            SyncState::Synced { last_seq } | SyncState::Desynced { last_seq, .. } => Some(last_seq),
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best().map(|l| l.price)
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best().map(|l| l.price)
    }

    /// Size at `price` on `side`, if the level exists
    pub fn size_at(&self, side: Side, price: Decimal) -> Option<PriceLevel> {
        self.side(side)
            .levels()
            .get(&price)
            .map(|size| PriceLevel::new(price, size))
    }
}

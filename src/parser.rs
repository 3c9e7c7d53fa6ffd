//! Parser module for order book feed messages
//!
//! Decodes snapshot and delta frames into [`FeedEvent`]s and encodes the
//! subscription requests sent on each session.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::{FeedError, Result};
use crate::orderbook::PriceLevel;

/// Full book at `seq_num`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookSnapshot {
    #[serde(rename = "seqNum")]
    pub seq_num: u64,

    #[serde(deserialize_with = "deserialize_price_levels")]
    pub bids: Vec<PriceLevel>,

    #[serde(deserialize_with = "deserialize_price_levels")]
    pub asks: Vec<PriceLevel>,

    /// Exchange timestamp (milliseconds)
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Changed levels between `prev_seq_num` and `seq_num`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookDelta {
    #[serde(rename = "seqNum")]
    pub seq_num: u64,

    #[serde(rename = "prevSeqNum")]
    pub prev_seq_num: u64,

    #[serde(deserialize_with = "deserialize_price_levels")]
    pub bids: Vec<PriceLevel>,

    #[serde(deserialize_with = "deserialize_price_levels")]
    pub asks: Vec<PriceLevel>,

    /// Exchange timestamp (milliseconds)
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Event delivered from the transport to the order book, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Snapshot(BookSnapshot),
    Delta(BookDelta),
    ConnectionOpened,
    ConnectionClosed,
}

impl FeedEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::Snapshot(_) => "snapshot",
            FeedEvent::Delta(_) => "delta",
            FeedEvent::ConnectionOpened => "connection_opened",
            FeedEvent::ConnectionClosed => "connection_closed",
        }
    }
}

/// Book payload, tagged by `type`
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum BookData {
    Snapshot(BookSnapshot),
    Delta(BookDelta),
}

/// Outer frame; frames without `data` are acks and info messages
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    topic: Option<String>,

    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Decode one text frame.
///
/// Returns `Ok(None)` for control frames that carry no book data.
pub fn decode(raw: &str) -> Result<Option<FeedEvent>> {
    let envelope: Envelope = serde_json::from_str(raw)?;

    let Some(data) = envelope.data else {
        tracing::trace!(msg = %raw, "Control frame");
        return Ok(None);
    };

    let data: BookData = serde_json::from_value(data).map_err(|e| {
        FeedError::ParseError(format!(
            "invalid book data on topic {:?}: {}",
            envelope.topic.as_deref().unwrap_or("?"),
            e
        ))
    })?;

    Ok(Some(match data {
        BookData::Snapshot(snapshot) => FeedEvent::Snapshot(snapshot),
        BookData::Delta(delta) => FeedEvent::Delta(delta),
    }))
}

/// Subscription request sent to the feed
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequest<'a> {
    pub op: &'static str,
    pub args: [&'a str; 1],
}

impl<'a> SubscriptionRequest<'a> {
    pub fn subscribe(topic: &'a str) -> Self {
        Self {
            op: "subscribe",
            args: [topic],
        }
    }

    pub fn unsubscribe(topic: &'a str) -> Self {
        Self {
            op: "unsubscribe",
            args: [topic],
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| FeedError::SerializationError(e.to_string()))
    }
}

/// Custom deserializer for price levels from array of string pairs.
///
/// Sizes must be non-negative; a zero size is kept so deltas can remove levels.
fn deserialize_price_levels<'de, D>(deserializer: D) -> std::result::Result<Vec<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<String>> = Deserialize::deserialize(deserializer)?;
    raw.into_iter()
        .map(|pair| {
            if pair.len() != 2 {
                return Err(serde::de::Error::custom("Invalid price level format"));
            }
            let price = Decimal::from_str(&pair[0]).map_err(serde::de::Error::custom)?;
            let size = Decimal::from_str(&pair[1]).map_err(serde::de::Error::custom)?;
            if size < Decimal::ZERO {
                return Err(serde::de::Error::custom(format!(
                    "negative size {} at price {}",
                    size, price
                )));
            }
            Ok(PriceLevel { price, size })
        })
        .collect()
}

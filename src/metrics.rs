//! Feed activity counters
//!
//! Each engine owns its own registry so several engines (or tests) can live in
//! one process.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::error::{FeedError, Result};
use crate::orderbook::ApplyOutcome;
use crate::parser::FeedEvent;

/// Counters for the transport and the book writer
#[derive(Clone)]
pub struct FeedMetrics {
    registry: Registry,
    pub messages_received: IntCounter,
    pub decode_errors: IntCounter,
    pub snapshots_applied: IntCounter,
    pub deltas_applied: IntCounter,
    pub deltas_discarded: IntCounter,
    pub sequence_gaps: IntCounter,
    pub reconnects: IntCounter,
    pub connected: IntGauge,
}

impl FeedMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("orderbook_feed".to_string()), None)?;

        let messages_received =
            IntCounter::new("messages_received_total", "Text frames received from the feed")?;
        let decode_errors =
            IntCounter::new("decode_errors_total", "Frames dropped because they failed to decode")?;
        let snapshots_applied =
            IntCounter::new("snapshots_applied_total", "Snapshots applied to the book")?;
        let deltas_applied = IntCounter::new("deltas_applied_total", "Deltas applied to the book")?;
        let deltas_discarded = IntCounter::new(
            "deltas_discarded_total",
            "Deltas dropped before a snapshot or while desynced",
        )?;
        let sequence_gaps =
            IntCounter::new("sequence_gaps_total", "Sequence gaps that forced a resubscribe")?;
        let reconnects = IntCounter::new("reconnects_total", "Transport sessions lost")?;
        let connected = IntGauge::new("connected", "1 while a subscribed session is open")?;

        registry.register(Box::new(messages_received.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(snapshots_applied.clone()))?;
        registry.register(Box::new(deltas_applied.clone()))?;
        registry.register(Box::new(deltas_discarded.clone()))?;
        registry.register(Box::new(sequence_gaps.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(connected.clone()))?;

        Ok(Self {
            registry,
            messages_received,
            decode_errors,
            snapshots_applied,
            deltas_applied,
            deltas_discarded,
            sequence_gaps,
            reconnects,
            connected,
        })
    }

    /// Count the result of one book event
    pub fn record(&self, event: &FeedEvent, outcome: ApplyOutcome) {
        match (event, outcome) {
            (FeedEvent::Snapshot(_), ApplyOutcome::Applied) => self.snapshots_applied.inc(),
            (FeedEvent::Delta(_), ApplyOutcome::Applied) => self.deltas_applied.inc(),
            (FeedEvent::Delta(_), ApplyOutcome::Discarded) => self.deltas_discarded.inc(),
            (_, ApplyOutcome::GapDetected { .. }) => self.sequence_gaps.inc(),
            _ => {}
        }
    }

    /// Render in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| FeedError::MetricsError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BookDelta;

    #[test]
    fn test_record_and_encode() {
        let metrics = FeedMetrics::new().unwrap();
        let delta = FeedEvent::Delta(BookDelta {
            seq_num: 2,
            prev_seq_num: 1,
            bids: vec![],
            asks: vec![],
            timestamp: None,
        });

        metrics.record(&delta, ApplyOutcome::Applied);
        metrics.record(&delta, ApplyOutcome::Discarded);
        metrics.record(
            &delta,
            ApplyOutcome::GapDetected {
                expected: 1,
                received: 0,
            },
        );

        assert_eq!(metrics.deltas_applied.get(), 1);
        assert_eq!(metrics.deltas_discarded.get(), 1);
        assert_eq!(metrics.sequence_gaps.get(), 1);

        let text = metrics.encode().unwrap();
        assert!(text.contains("orderbook_feed_deltas_applied_total 1"));
    }

    #[test]
    fn test_independent_registries() {
        let a = FeedMetrics::new().unwrap();
        let b = FeedMetrics::new().unwrap();
        a.reconnects.inc();
        assert_eq!(b.reconnects.get(), 0);
    }
}

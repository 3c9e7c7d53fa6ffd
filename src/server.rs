//! HTTP surface for health checks, the top-of-book view and metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::BookReader;
use crate::metrics::FeedMetrics;
use crate::orderbook::BookView;

/// State shared by the HTTP handlers
pub struct AppState {
    pub reader: BookReader,
    pub metrics: FeedMetrics,
}

/// Upper bound on `?depth=` to keep responses small
const MAX_VIEW_DEPTH: usize = 500;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/book", get(book))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let view = state.reader.view_with_depth(1).await;
    let connection = state.reader.connection_status();
    Json(serde_json::json!({
        "component": "orderbook-feed",
        "connected": connection.is_connected(),
        "connection": connection,
        "health": view.health,
        "state": view.state,
        "last_seq": view.last_seq,
        "last_update": view.last_update,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub depth: Option<usize>,
}

pub async fn book(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookQuery>,
) -> Json<BookView> {
    let depth = query
        .depth
        .unwrap_or_else(|| state.reader.depth())
        .min(MAX_VIEW_DEPTH);
    Json(state.reader.view_with_depth(depth).await)
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::{FeedHealth, OrderBook, PriceLevel};
    use crate::parser::{BookSnapshot, FeedEvent};
    use crate::websocket::ConnectionStatus;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tokio::sync::{watch, RwLock};

    fn app_state(status: ConnectionStatus) -> Arc<AppState> {
        let mut book = OrderBook::new("update:BTCPFC");
        book.apply(&FeedEvent::Snapshot(BookSnapshot {
            seq_num: 7,
            bids: (0..20)
                .map(|i| PriceLevel::new(dec!(100) - rust_decimal::Decimal::from(i), dec!(1)))
                .collect(),
            asks: vec![PriceLevel::new(dec!(101), dec!(2))],
            timestamp: None,
        }));
        let (_tx, rx) = watch::channel(status);
        Arc::new(AppState {
            reader: BookReader::new(Arc::new(RwLock::new(book)), rx, 8, Duration::from_secs(10)),
            metrics: FeedMetrics::new().unwrap(),
        })
    }

    #[tokio::test]
    async fn test_book_uses_configured_depth() {
        let state = app_state(ConnectionStatus::Connected);
        let Json(view) = book(State(state.clone()), Query(BookQuery { depth: None })).await;
        assert_eq!(view.bids.len(), 8);
        assert_eq!(view.bids[0].price, dec!(100));
        assert_eq!(view.asks, vec![PriceLevel::new(dec!(101), dec!(2))]);
        assert_eq!(view.health, FeedHealth::Live);

        let Json(view) = book(State(state), Query(BookQuery { depth: Some(3) })).await;
        assert_eq!(view.bids.len(), 3);
    }

    #[tokio::test]
    async fn test_health_reports_reconnecting() {
        let state = app_state(ConnectionStatus::Reconnecting {
            attempt: 1,
            delay_ms: 500,
        });
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["health"], "reconnecting");
        assert_eq!(body["connected"], false);
        assert_eq!(body["connection"]["status"], "reconnecting");
        assert_eq!(body["last_seq"], 7);
    }

    #[tokio::test]
    async fn test_health_reports_live_when_connected() {
        let state = app_state(ConnectionStatus::Connected);
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["connected"], true);
        assert_eq!(body["health"], "live");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = app_state(ConnectionStatus::Connected);
        state.metrics.reconnects.inc();
        let (status, body) = metrics(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("orderbook_feed_reconnects_total 1"));
    }
}

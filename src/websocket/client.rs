//! WebSocket client for the book feed
//!
//! Handles connection, subscription, and message reception for one session.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::error::{FeedError, Result};
use crate::parser::SubscriptionRequest;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client for a single connection
pub struct WebSocketClient {
    stream: Option<WsStream>,
    endpoint: String,
    topic: String,
}

impl WebSocketClient {
    /// Create a new WebSocket client
    pub fn new(endpoint: &str, topic: &str) -> Self {
        Self {
            stream: None,
            endpoint: endpoint.to_string(),
            topic: topic.to_string(),
        }
    }

    /// Connect to the WebSocket endpoint
    pub async fn connect(&mut self) -> Result<()> {
        info!(url = %self.endpoint, "Connecting to feed WebSocket");

        let (ws_stream, response) = connect_async(self.endpoint.as_str()).await.map_err(|e| {
            FeedError::WebSocketConnection(format!("Failed to connect: {}", e))
        })?;

        info!(status = ?response.status(), "WebSocket connected");
        self.stream = Some(ws_stream);

        Ok(())
    }

    /// Send the subscribe request for the configured topic
    pub async fn subscribe(&mut self) -> Result<()> {
        let request = SubscriptionRequest::subscribe(&self.topic).to_json()?;
        self.send_text(request).await?;
        info!(topic = %self.topic, "Subscribed");
        Ok(())
    }

    /// Drop and re-request the subscription so the feed sends a new snapshot
    pub async fn resubscribe(&mut self) -> Result<()> {
        let request = SubscriptionRequest::unsubscribe(&self.topic).to_json()?;
        self.send_text(request).await?;
        debug!(topic = %self.topic, "Unsubscribed");
        self.subscribe().await
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| FeedError::WebSocketConnection("Not connected".to_string()))?;

        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| FeedError::WebSocketMessage(e.to_string()))
    }

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` for control frames. Pongs are queued by tungstenite
    /// itself while reading.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| FeedError::WebSocketConnection("Not connected".to_string()))?;

        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!(len = text.len(), "Received text message");
                Ok(Some(text))
            }
            Some(Ok(Message::Binary(data))) => {
                let text = String::from_utf8_lossy(&data).to_string();
                Ok(Some(text))
            }
            Some(Ok(Message::Ping(_))) => {
                debug!("Received ping");
                Ok(None)
            }
            Some(Ok(Message::Pong(_))) => {
                debug!("Received pong");
                Ok(None)
            }
            Some(Ok(Message::Close(frame))) => {
                warn!(frame = ?frame, "Received close frame");
                self.stream = None;
                Err(FeedError::WebSocketConnection(
                    "Connection closed".to_string(),
                ))
            }
            Some(Ok(Message::Frame(_))) => Ok(None),
            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                self.stream = None;
                Err(FeedError::WebSocketMessage(e.to_string()))
            }
            None => {
                warn!("WebSocket stream ended");
                self.stream = None;
                Err(FeedError::WebSocketConnection(
                    "Stream ended".to_string(),
                ))
            }
        }
    }

    /// Send a ping to keep connection alive
    pub async fn ping(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.as_mut() {
            stream
                .send(Message::Ping(vec![]))
                .await
                .map_err(|e| FeedError::WebSocketMessage(e.to_string()))?;
        }
        Ok(())
    }

    /// Close the connection
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}

//! Delivery transports.

use crate::error::SyncError;
use crate::snapshot::ContextSnapshot;
use async_trait::async_trait;
use futures_util::SinkExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// One-way delivery of a snapshot to the sync endpoint.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn deliver(&self, snapshot: &ContextSnapshot) -> Result<(), SyncError>;
}

/// WebSocket publisher.
///
/// Connects per delivery, pushes one JSON text frame, and closes. The
/// core never holds the duplex connection open or waits on inbound
/// messages from the channel.
pub struct WsSyncTransport {
    endpoint: String,
}

impl WsSyncTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SyncTransport for WsSyncTransport {
    async fn deliver(&self, snapshot: &ContextSnapshot) -> Result<(), SyncError> {
        let payload =
            serde_json::to_string(snapshot).map_err(|e| SyncError::Serialization(e.to_string()))?;

        let (mut socket, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| SyncError::Unreachable(e.to_string()))?;

        socket
            .send(Message::Text(payload))
            .await
            .map_err(|_| SyncError::Closed)?;
        socket.close(None).await.map_err(|_| SyncError::Closed)?;
        Ok(())
    }
}

//! Publisher boundary toward the dashboard state layer
//!
//! Invoked only on successful executions, fire-and-forget: the engine never
//! blocks on or retries a publish. Delivery failures are the collaborator's
//! concern.

use async_trait::async_trait;
use suri_core::WidgetId;
use tokio::sync::mpsc;
use tracing::info;

/// Sink for successful widget payloads
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Forward a new payload for an instance
    async fn publish(&self, id: WidgetId, payload: &str);
}

/// Publisher that only logs. Payload content is never logged; it may embed
/// resolved secrets echoed back by a script.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, id: WidgetId, payload: &str) {
        info!("Published {} byte payload for widget {}", payload.len(), id);
    }
}

/// Publisher forwarding payloads over an unbounded channel, used by the CLI
/// and by tests to observe engine output.
#[derive(Debug)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<(WidgetId, String)>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(WidgetId, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, id: WidgetId, payload: &str) {
        // A dropped receiver means nobody is watching; that is fine
        let _ = self.tx.send((id, payload.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_publisher_forwards_payloads() {
        let (publisher, mut rx) = ChannelPublisher::new();
        let id = WidgetId::new();

        publisher.publish(id, "{\"v\":1}").await;

        let (received_id, payload) = rx.recv().await.unwrap();
        assert_eq!(received_id, id);
        assert_eq!(payload, "{\"v\":1}");
    }

    #[tokio::test]
    async fn test_channel_publisher_survives_dropped_receiver() {
        let (publisher, rx) = ChannelPublisher::new();
        drop(rx);

        // Must not panic or error
        publisher.publish(WidgetId::new(), "{}").await;
    }
}

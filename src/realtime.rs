//! Real-time fan-out to dashboards
//!
//! One `tokio::sync::broadcast` channel feeds every SSE and WebSocket client.
//! Delivery is best-effort: a slow subscriber lags and is told so, a closed
//! one simply drops its receiver, and neither affects anyone else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

pub const SENSOR_UPDATE: &str = "sensor-update";
pub const MISTING_STARTED: &str = "misting-started";
pub const MISTING_ENDED: &str = "misting-ended";
pub const NOTIFICATION: &str = "notification";
pub const MODE_CHANGED: &str = "mode-changed";

/// Frame pushed to every connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub event: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl RealtimeEvent {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast hub shared by the correlator and the HTTP layer
#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers; returns how many received it
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!("No real-time subscribers for {}", event.event);
                0
            }
        }
    }

    /// Serialize `data` and publish it under `event`
    pub fn emit<T: Serialize>(&self, event: &str, data: &T) -> usize {
        match serde_json::to_value(data) {
            Ok(value) => self.publish(RealtimeEvent::new(event, value)),
            Err(e) => {
                tracing::warn!("Failed to serialize {event} payload: {e}");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

//! Pump command publishing
//!
//! The correlator talks to the shed controller through
//! [`PumpCommandPublisher`]. Production uses the MQTT client; offline mode
//! and tests use [`OfflinePublisher`], which records commands in memory.

#[cfg(feature = "mqtt")]
pub mod mqtt_client;

use crate::error::{AgriError, Result};
use crate::models::MistingMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

#[cfg(feature = "mqtt")]
pub use mqtt_client::{BrokerSelector, BrokerTarget, MqttClient};

/// Command sent to the shed controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "lowercase")]
pub enum PumpCommand {
    Pump(bool),
    Mode(MistingMode),
}

impl PumpCommand {
    /// Wire payload (`ON`/`OFF`, `AUTO`/`MANUAL`)
    pub fn payload(&self) -> &'static str {
        match self {
            PumpCommand::Pump(true) => "ON",
            PumpCommand::Pump(false) => "OFF",
            PumpCommand::Mode(mode) => mode.as_str(),
        }
    }
}

/// Outbound channel to the pump controller
#[async_trait]
pub trait PumpCommandPublisher: Send + Sync {
    /// Ask the controller to switch the pump
    async fn publish_pump(&self, on: bool) -> Result<()>;

    /// Tell the controller which mode is active
    async fn publish_mode(&self, mode: MistingMode) -> Result<()>;

    /// Whether commands can currently be delivered
    fn is_connected(&self) -> bool;

    /// Short name for health output
    fn transport(&self) -> &'static str;
}

/// In-memory publisher for offline runs and tests
#[derive(Debug)]
pub struct OfflinePublisher {
    commands: Mutex<Vec<PumpCommand>>,
    available: AtomicBool,
}

impl Default for OfflinePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflinePublisher {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the controller going away (publishes fail while unavailable)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Commands published so far, oldest first
    pub async fn commands(&self) -> Vec<PumpCommand> {
        self.commands.lock().await.clone()
    }

    async fn record(&self, command: PumpCommand) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AgriError::service_unavailable(
                "Pump controller is not reachable",
            ));
        }
        debug!("Offline publisher recorded {:?}", command);
        self.commands.lock().await.push(command);
        Ok(())
    }
}

#[async_trait]
impl PumpCommandPublisher for OfflinePublisher {
    async fn publish_pump(&self, on: bool) -> Result<()> {
        self.record(PumpCommand::Pump(on)).await
    }

    async fn publish_mode(&self, mode: MistingMode) -> Result<()> {
        self.record(PumpCommand::Mode(mode)).await
    }

    fn is_connected(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn transport(&self) -> &'static str {
        "offline"
    }
}

//! Pump notifications

use super::misting::MistingMode;
use crate::climate::MetricsSnapshot;
use crate::error::AgriError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PumpOn,
    PumpOff,
    ManualOn,
    ManualOff,
    AutoMode,
}

impl NotificationKind {
    /// Kind for a pump transition in the given mode
    pub fn for_transition(pump_on: bool, mode: MistingMode) -> Self {
        match (mode, pump_on) {
            (MistingMode::Auto, true) => NotificationKind::PumpOn,
            (MistingMode::Auto, false) => NotificationKind::PumpOff,
            (MistingMode::Manual, true) => NotificationKind::ManualOn,
            (MistingMode::Manual, false) => NotificationKind::ManualOff,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PumpOn => "PUMP_ON",
            NotificationKind::PumpOff => "PUMP_OFF",
            NotificationKind::ManualOn => "MANUAL_ON",
            NotificationKind::ManualOff => "MANUAL_OFF",
            NotificationKind::AutoMode => "AUTO_MODE",
        }
    }

    /// True for kinds that announce the pump switching on
    pub fn is_on(&self) -> bool {
        matches!(self, NotificationKind::PumpOn | NotificationKind::ManualOn)
    }

    /// True for kinds that announce the pump switching off
    pub fn is_off(&self) -> bool {
        matches!(self, NotificationKind::PumpOff | NotificationKind::ManualOff)
    }
}

impl FromStr for NotificationKind {
    type Err = AgriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUMP_ON" => Ok(NotificationKind::PumpOn),
            "PUMP_OFF" => Ok(NotificationKind::PumpOff),
            "MANUAL_ON" => Ok(NotificationKind::ManualOn),
            "MANUAL_OFF" => Ok(NotificationKind::ManualOff),
            "AUTO_MODE" => Ok(NotificationKind::AutoMode),
            other => Err(AgriError::parsing_error(format!(
                "Unknown notification kind '{other}'"
            ))),
        }
    }
}

/// Stored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub pump_status: bool,
    pub mode: MistingMode,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification about to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub message: String,
    pub snapshot: MetricsSnapshot,
    pub pump_status: bool,
    pub mode: MistingMode,
}

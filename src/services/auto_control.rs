//! Threshold logic for AUTO mode

use crate::climate::MetricsSnapshot;
use crate::config::AutomationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoDecision {
    TurnOn,
    TurnOff,
    Hold,
}

impl AutoDecision {
    /// Requested pump state, if any
    pub fn target(&self) -> Option<bool> {
        match self {
            AutoDecision::TurnOn => Some(true),
            AutoDecision::TurnOff => Some(false),
            AutoDecision::Hold => None,
        }
    }
}

/// Hysteresis band on heat index (temperature when humidity is missing)
#[derive(Debug, Clone, Copy)]
pub struct AutoController {
    on_threshold: f64,
    off_threshold: f64,
}

impl AutoController {
    pub fn new(config: &AutomationConfig) -> Self {
        Self {
            on_threshold: config.on_threshold,
            off_threshold: config.off_threshold,
        }
    }

    pub fn decide(&self, snapshot: &MetricsSnapshot, pump_on: bool) -> AutoDecision {
        let Some(value) = snapshot.control_value() else {
            return AutoDecision::Hold;
        };

        if !pump_on && value >= self.on_threshold {
            AutoDecision::TurnOn
        } else if pump_on && value <= self.off_threshold {
            AutoDecision::TurnOff
        } else {
            AutoDecision::Hold
        }
    }
}

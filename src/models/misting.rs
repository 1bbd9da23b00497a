//! Misting sessions: one ON→OFF cycle of the cooling pump

use crate::climate::MetricsSnapshot;
use crate::error::AgriError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Who is driving the pump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MistingMode {
    #[default]
    Auto,
    Manual,
}

impl MistingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MistingMode::Auto => "AUTO",
            MistingMode::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for MistingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MistingMode {
    type Err = AgriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(MistingMode::Auto),
            "MANUAL" => Ok(MistingMode::Manual),
            other => Err(AgriError::invalid_input(format!(
                "Unknown misting mode '{other}'"
            ))),
        }
    }
}

/// Stored misting session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistingSession {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub start_metrics: MetricsSnapshot,
    pub end_metrics: Option<MetricsSnapshot>,
    pub mode: MistingMode,
}

impl MistingSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// `endedAt - startedAt`, floored at zero; `None` while the session is open
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at
            .map(|end| (end - self.started_at).max(Duration::zero()))
    }

    /// Duration in minutes; open sessions count as zero
    pub fn duration_minutes(&self) -> f64 {
        self.duration()
            .map(|d| d.num_milliseconds() as f64 / 60_000.0)
            .unwrap_or(0.0)
    }
}

/// Body of `POST /api/misting/start`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSession {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heat_index: Option<f64>,
    pub water_level: Option<i64>,
    #[serde(default, alias = "mistingType")]
    pub mode: Option<MistingMode>,
}

impl StartSession {
    pub fn from_snapshot(snapshot: MetricsSnapshot, mode: MistingMode) -> Self {
        Self {
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            heat_index: snapshot.heat_index,
            water_level: snapshot.water_level,
            mode: Some(mode),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_metrics(self.temperature, self.humidity, self.water_level)
            .with_heat_index_or_derived(self.heat_index)
    }
}

/// Body of `PUT /api/misting/end/:id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSession {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heat_index: Option<f64>,
    pub water_level: Option<i64>,
}

impl EndSession {
    pub fn from_snapshot(snapshot: MetricsSnapshot) -> Self {
        Self {
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            heat_index: snapshot.heat_index,
            water_level: snapshot.water_level,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_metrics(self.temperature, self.humidity, self.water_level)
            .with_heat_index_or_derived(self.heat_index)
    }
}

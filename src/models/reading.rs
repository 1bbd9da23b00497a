//! Sensor readings as reported by the shed controller

use crate::climate::MetricsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Stored sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub water_level: Option<i64>,
    pub pump_on: bool,
    pub captured_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_metrics(self.temperature, self.humidity, self.water_level)
    }
}

/// Reading as it arrives over HTTP or MQTT
///
/// Field devices are sloppy: values may be missing, `null`, `NaN` or sent as
/// strings. None of that rejects the reading; the field is just dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReading {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub water_level: Option<f64>,

    /// Absent means "unchanged"
    #[serde(default, alias = "pumpStatus", deserialize_with = "lenient_bool")]
    pub pump_on: Option<bool>,

    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl IngestReading {
    pub fn new(temperature: f64, humidity: f64, water_level: f64, pump_on: bool) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
            water_level: Some(water_level),
            pump_on: Some(pump_on),
            captured_at: None,
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature.filter(|v| v.is_finite())
    }

    pub fn humidity(&self) -> Option<f64> {
        self.humidity.filter(|v| v.is_finite())
    }

    /// Water level as a whole percentage clamped to 0-100
    pub fn water_level(&self) -> Option<i64> {
        self.water_level
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(0.0, 100.0) as i64)
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
        Some(serde_json::Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Some(true),
            "off" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

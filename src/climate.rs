//! Shed climate calculations
//!
//! Heat index, temperature zones and the metric snapshot attached to
//! sessions and notifications.

use serde::{Deserialize, Serialize};

/// NOAA Rothfusz regression, evaluated in °F and reported in °C (2 decimals)
pub fn heat_index_celsius(temp_c: f64, humidity: f64) -> f64 {
    let t = temp_c * 9.0 / 5.0 + 32.0;
    let r = humidity;

    let hi_f = -42.379 + 2.049_015_23 * t + 10.143_331_27 * r
        - 0.224_755_41 * t * r
        - 0.006_837_83 * t * t
        - 0.054_817_17 * r * r
        + 0.001_228_74 * t * t * r
        + 0.000_852_82 * t * r * r
        - 0.000_001_99 * t * t * r * r;

    round_to((hi_f - 32.0) * 5.0 / 9.0, 2)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Shed temperature classification used by reports and dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureZone {
    /// Below 30 °C
    Safe,
    /// 30 °C up to (not including) 35 °C
    Warning,
    /// 35 °C and above
    Danger,
}

impl TemperatureZone {
    pub fn classify(temp_c: f64) -> Self {
        if temp_c < 30.0 {
            TemperatureZone::Safe
        } else if temp_c < 35.0 {
            TemperatureZone::Warning
        } else {
            TemperatureZone::Danger
        }
    }
}

/// Environmental snapshot taken at a transition
///
/// Every field is optional: a sensor may drop a value and the snapshot keeps
/// whatever was reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heat_index: Option<f64>,
    pub water_level: Option<i64>,
}

impl MetricsSnapshot {
    /// Build a snapshot, deriving the heat index when both inputs exist
    ///
    /// The water level is a tank percentage and is clamped to 0..=100.
    pub fn from_metrics(
        temperature: Option<f64>,
        humidity: Option<f64>,
        water_level: Option<i64>,
    ) -> Self {
        let heat_index = match (temperature, humidity) {
            (Some(t), Some(h)) => Some(heat_index_celsius(t, h)),
            _ => None,
        };

        Self {
            temperature,
            humidity,
            heat_index,
            water_level: water_level.map(|level| level.clamp(0, 100)),
        }
    }

    /// Keep an explicitly supplied heat index, otherwise derive one
    pub fn with_heat_index_or_derived(mut self, heat_index: Option<f64>) -> Self {
        if let Some(hi) = heat_index.filter(|v| v.is_finite()) {
            self.heat_index = Some(hi);
        } else if self.heat_index.is_none() {
            self.heat_index = Self::from_metrics(self.temperature, self.humidity, None).heat_index;
        }
        self
    }

    /// Value the auto controller compares against its thresholds
    pub fn control_value(&self) -> Option<f64> {
        self.heat_index.or(self.temperature)
    }

    /// One-line summary embedded in notification messages
    pub fn describe(&self) -> String {
        fn or_dash(value: Option<f64>, unit: &str) -> String {
            value
                .map(|v| format!("{v:.1}{unit}"))
                .unwrap_or_else(|| "--".to_string())
        }

        format!(
            "Temp: {}, Humidity: {}, Heat Index: {}, Water: {}",
            or_dash(self.temperature, "°C"),
            or_dash(self.humidity, "%"),
            or_dash(self.heat_index, "°C"),
            self.water_level
                .map(|w| format!("{w}%"))
                .unwrap_or_else(|| "--".to_string()),
        )
    }
}

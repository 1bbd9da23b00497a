//! Livestock thermal scans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body-temperature classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "Low Temp")]
    LowTemp,
    Healthy,
    Elevated,
    #[serde(rename = "Fever Alert")]
    FeverAlert,
}

impl HealthStatus {
    pub fn from_body_temp(body_temp: f64) -> Self {
        if body_temp < 38.0 {
            HealthStatus::LowTemp
        } else if body_temp <= 39.5 {
            HealthStatus::Healthy
        } else if body_temp < 40.0 {
            HealthStatus::Elevated
        } else {
            HealthStatus::FeverAlert
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::LowTemp => "Low Temp",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Elevated => "Elevated",
            HealthStatus::FeverAlert => "Fever Alert",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Low Temp" => Some(HealthStatus::LowTemp),
            "Healthy" => Some(HealthStatus::Healthy),
            "Elevated" => Some(HealthStatus::Elevated),
            "Fever Alert" => Some(HealthStatus::FeverAlert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalRecord {
    pub id: i64,
    pub name: String,
    pub body_temp: f64,
    pub avg_temp: f64,
    pub min_temp: f64,
    pub weight: Option<String>,
    pub age: Option<String>,
    pub breed: Option<String>,
    pub last_fed: Option<String>,
    pub ambient_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub health_status: HealthStatus,
    pub notes: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// Body of `POST /api/records`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThermalRecord {
    pub name: String,
    pub body_temp: f64,
    pub avg_temp: f64,
    pub min_temp: f64,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub last_fed: Option<String>,
    #[serde(default)]
    pub ambient_temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `POST /api/records/sensor` (thermal camera summary)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorThermalReading {
    #[serde(default)]
    pub max_temp: Option<f64>,
    #[serde(default)]
    pub min_temp: Option<f64>,
    pub avg_temp: f64,
}

/// Query parameters of `GET /api/records`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThermalFilter {
    pub search: Option<String>,
    /// 1-12 or `all`
    pub month: Option<String>,
    /// Four-digit year or `all`
    pub year: Option<String>,
}

/// Display form returned by the records listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedThermalRecord {
    pub id: i64,
    pub name: String,
    pub body_temp: String,
    pub avg_temp: String,
    pub min_temp: String,
    pub weight: Option<String>,
    pub age: Option<String>,
    pub breed: Option<String>,
    pub last_fed: Option<String>,
    pub ambient_temp: String,
    pub humidity: String,
    pub health_status: HealthStatus,
    pub notes: String,
    pub date: String,
    pub time: String,
}

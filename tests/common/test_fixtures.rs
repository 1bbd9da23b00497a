//! Test fixtures shared by the integration tests
//!
//! Readings and session payloads with realistic shed values, exposed as
//! rstest fixtures where a test wants them injected.

use agricool::config::ServerConfig;
use agricool::models::{IngestReading, StartSession};
use rstest::*;

/// Offline configuration: in-memory SQLite, no broker
#[fixture]
pub fn test_server_config() -> ServerConfig {
    ServerConfig::offline()
}

/// A reading with an explicit pump flag (or none, meaning "unchanged")
pub fn reading(temperature: f64, humidity: f64, water: f64, pump_on: Option<bool>) -> IngestReading {
    IngestReading {
        pump_on,
        ..IngestReading::new(temperature, humidity, water, false)
    }
}

/// Reading with no climate values, so AUTO mode never acts on it
pub fn pump_only(pump_on: Option<bool>) -> IngestReading {
    IngestReading {
        pump_on,
        ..IngestReading::default()
    }
}

/// Midday conditions in a hot shed
#[fixture]
pub fn hot_reading() -> IngestReading {
    reading(35.0, 70.0, 80.0, Some(false))
}

/// Conditions after misting has cooled the shed
#[fixture]
pub fn cool_reading() -> IngestReading {
    reading(27.5, 60.0, 70.0, Some(true))
}

#[fixture]
pub fn start_session() -> StartSession {
    StartSession {
        temperature: Some(33.4),
        humidity: Some(68.0),
        heat_index: None,
        water_level: Some(92),
        mode: None,
    }
}

/// Shed metric values used across tests
pub struct ShedValues;

impl ShedValues {
    pub const SAFE_TEMP: f64 = 28.0;
    pub const WARNING_TEMP: f64 = 32.5;
    pub const DANGER_TEMP: f64 = 36.0;
}

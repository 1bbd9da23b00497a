use super::{decode_ts, encode_ts, Database};
use crate::error::{AgriError, Result};
use crate::models::SensorReading;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

impl Database {
    pub async fn insert_reading(
        &self,
        temperature: Option<f64>,
        humidity: Option<f64>,
        water_level: Option<i64>,
        pump_on: bool,
        captured_at: DateTime<Utc>,
    ) -> Result<SensorReading> {
        let result = sqlx::query(
            "INSERT INTO sensor_readings (temperature, humidity, water_level, pump_on, captured_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(temperature)
        .bind(humidity)
        .bind(water_level)
        .bind(pump_on)
        .bind(encode_ts(&captured_at))
        .execute(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to store reading: {e}")))?;

        Ok(SensorReading {
            id: result.last_insert_rowid(),
            temperature,
            humidity,
            water_level,
            pump_on,
            captured_at,
        })
    }

    /// Newest first
    pub async fn list_readings(&self, limit: u32) -> Result<Vec<SensorReading>> {
        let rows = sqlx::query(
            "SELECT id, temperature, humidity, water_level, pump_on, captured_at
             FROM sensor_readings ORDER BY captured_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to list readings: {e}")))?;

        rows.iter().map(row_to_reading).collect()
    }

    pub async fn latest_reading(&self) -> Result<Option<SensorReading>> {
        let row = sqlx::query(
            "SELECT id, temperature, humidity, water_level, pump_on, captured_at
             FROM sensor_readings ORDER BY captured_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to load latest reading: {e}")))?;

        row.as_ref().map(row_to_reading).transpose()
    }
}

fn row_to_reading(row: &SqliteRow) -> Result<SensorReading> {
    let captured_at: String = row.try_get("captured_at")?;
    Ok(SensorReading {
        id: row.try_get("id")?,
        temperature: row.try_get("temperature")?,
        humidity: row.try_get("humidity")?,
        water_level: row.try_get("water_level")?,
        pump_on: row.try_get("pump_on")?,
        captured_at: decode_ts(&captured_at)?,
    })
}

use super::{decode_ts, encode_ts, Database};
use crate::error::{AgriError, Result};
use crate::models::{HealthStatus, NewThermalRecord, ThermalRecord};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

const THERMAL_COLUMNS: &str = "id, name, body_temp, avg_temp, min_temp, weight, age, breed,
    last_fed, ambient_temp, humidity, health_status, notes, scanned_at";

impl Database {
    pub async fn insert_thermal_record(
        &self,
        record: &NewThermalRecord,
        health_status: HealthStatus,
        scanned_at: DateTime<Utc>,
    ) -> Result<ThermalRecord> {
        let result = sqlx::query(
            "INSERT INTO thermal_records
                (name, body_temp, avg_temp, min_temp, weight, age, breed, last_fed,
                 ambient_temp, humidity, health_status, notes, scanned_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.name)
        .bind(record.body_temp)
        .bind(record.avg_temp)
        .bind(record.min_temp)
        .bind(&record.weight)
        .bind(&record.age)
        .bind(&record.breed)
        .bind(&record.last_fed)
        .bind(record.ambient_temp)
        .bind(record.humidity)
        .bind(health_status.as_str())
        .bind(&record.notes)
        .bind(encode_ts(&scanned_at))
        .execute(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to store thermal record: {e}")))?;

        Ok(ThermalRecord {
            id: result.last_insert_rowid(),
            name: record.name.clone(),
            body_temp: record.body_temp,
            avg_temp: record.avg_temp,
            min_temp: record.min_temp,
            weight: record.weight.clone(),
            age: record.age.clone(),
            breed: record.breed.clone(),
            last_fed: record.last_fed.clone(),
            ambient_temp: record.ambient_temp,
            humidity: record.humidity,
            health_status,
            notes: record.notes.clone(),
            scanned_at,
        })
    }

    /// Newest first; `search` matches the name or the body temperature text
    pub async fn list_thermal_records(&self, search: Option<&str>) -> Result<Vec<ThermalRecord>> {
        let term = search.map(str::trim).filter(|s| !s.is_empty());
        let sql = match term {
            Some(_) => format!(
                "SELECT {THERMAL_COLUMNS} FROM thermal_records
                 WHERE name LIKE ? OR CAST(body_temp AS TEXT) LIKE ?
                 ORDER BY scanned_at DESC, id DESC"
            ),
            None => format!(
                "SELECT {THERMAL_COLUMNS} FROM thermal_records ORDER BY scanned_at DESC, id DESC"
            ),
        };

        let mut query = sqlx::query(&sql);
        if let Some(term) = term {
            let pattern = format!("%{term}%");
            query = query.bind(pattern.clone()).bind(pattern);
        }

        let rows = query
            .fetch_all(self.pool())
            .await
            .map_err(|e| AgriError::database(format!("Failed to list thermal records: {e}")))?;

        rows.iter().map(row_to_thermal).collect()
    }
}

fn row_to_thermal(row: &SqliteRow) -> Result<ThermalRecord> {
    let status: String = row.try_get("health_status")?;
    let scanned_at: String = row.try_get("scanned_at")?;
    let body_temp: f64 = row.try_get("body_temp")?;

    Ok(ThermalRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        body_temp,
        avg_temp: row.try_get("avg_temp")?,
        min_temp: row.try_get("min_temp")?,
        weight: row.try_get("weight")?,
        age: row.try_get("age")?,
        breed: row.try_get("breed")?,
        last_fed: row.try_get("last_fed")?,
        ambient_temp: row.try_get("ambient_temp")?,
        humidity: row.try_get("humidity")?,
        health_status: HealthStatus::parse(&status)
            .unwrap_or_else(|| HealthStatus::from_body_temp(body_temp)),
        notes: row.try_get("notes")?,
        scanned_at: decode_ts(&scanned_at)?,
    })
}

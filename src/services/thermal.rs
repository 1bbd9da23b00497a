//! Livestock thermal scan records

use crate::error::{AgriError, Result};
use crate::models::{
    FormattedThermalRecord, HealthStatus, NewThermalRecord, SensorThermalReading, ThermalFilter,
    ThermalRecord,
};
use crate::storage::Database;
use chrono::{Datelike, Local, TimeZone, Utc};
use rand::{seq::SliceRandom, Rng};
use tracing::info;

const PIG_NAMES: &[&str] = &[
    "Wilbur", "Babe", "Peppa", "Hamilton", "Napoleon", "Snowball", "Squealer", "Charlotte",
    "Porky", "Miss Piggy",
];
const BREEDS: &[&str] = &["Yorkshire", "Duroc", "Hampshire", "Berkshire", "Landrace"];

pub struct ThermalService {
    db: Database,
}

impl ThermalService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a manual scan; the health status is derived from body temperature
    pub async fn create(&self, record: NewThermalRecord) -> Result<ThermalRecord> {
        validate(&record)?;
        let status = HealthStatus::from_body_temp(record.body_temp);
        let saved = self
            .db
            .insert_thermal_record(&record, status, Utc::now())
            .await?;
        info!(record_id = saved.id, status = status.as_str(), "Thermal scan saved");
        Ok(saved)
    }

    /// Store a thermal camera summary as an "Auto-detected" record
    pub async fn create_from_sensor(&self, reading: SensorThermalReading) -> Result<ThermalRecord> {
        let body_temp = reading.max_temp.unwrap_or(reading.avg_temp);
        self.create(NewThermalRecord {
            name: "Auto-detected".to_string(),
            body_temp,
            avg_temp: reading.avg_temp,
            min_temp: reading.min_temp.unwrap_or(reading.avg_temp),
            weight: Some("N/A".to_string()),
            age: Some("N/A".to_string()),
            breed: Some("N/A".to_string()),
            last_fed: Some("N/A".to_string()),
            ambient_temp: None,
            humidity: None,
            notes: Some("Automatic thermal reading from MLX90640 sensor".to_string()),
        })
        .await
    }

    /// Filtered listing in display form, newest first
    pub async fn list(&self, filter: &ThermalFilter) -> Result<Vec<FormattedThermalRecord>> {
        let month = parse_filter(filter.month.as_deref(), "month")?;
        let year = parse_filter(filter.year.as_deref(), "year")?;

        if let Some(month) = month {
            if !(1..=12).contains(&month) {
                return Err(AgriError::invalid_input(format!(
                    "Month must be between 1 and 12, got {month}"
                )));
            }
        }

        let records = self.db.list_thermal_records(filter.search.as_deref()).await?;
        Ok(records
            .iter()
            .filter(|record| {
                let local = record.scanned_at.with_timezone(&Local);
                month.map_or(true, |m| local.month() as i32 == m)
                    && year.map_or(true, |y| local.year() == y)
            })
            .map(|record| format_record(record, &Local))
            .collect())
    }

    /// Store a randomized, plausible scan for demos without the camera
    pub async fn simulate_scan(&self) -> Result<ThermalRecord> {
        let record = {
            let mut rng = rand::thread_rng();
            let mut between = |min: f64, max: f64| round1(rng.gen_range(min..max));

            let body_temp = between(37.5, 40.5);
            let avg_temp = round1(body_temp - between(0.2, 0.8));
            let min_temp = round1(avg_temp - between(0.3, 0.7));
            let ambient_temp = between(25.0, 32.0);
            let humidity = between(60.0, 85.0);

            let notes = if body_temp >= 40.0 {
                "High fever detected. Immediate veterinary attention recommended."
            } else if body_temp > 39.5 {
                "Temperature slightly elevated. Continue monitoring."
            } else {
                "No abnormalities detected. Pig appears healthy."
            };

            NewThermalRecord {
                name: format!(
                    "{}-{}",
                    PIG_NAMES.choose(&mut rng).copied().unwrap_or("Pig"),
                    rng.gen_range(0..100)
                ),
                body_temp,
                avg_temp,
                min_temp,
                weight: Some(format!("{}kg", rng.gen_range(80..130))),
                age: Some(format!("{} months", rng.gen_range(6..18))),
                breed: BREEDS.choose(&mut rng).map(|b| b.to_string()),
                last_fed: Some(format!("{}h ago", rng.gen_range(1..7))),
                ambient_temp: Some(ambient_temp),
                humidity: Some(humidity),
                notes: Some(notes.to_string()),
            }
        };

        self.create(record).await
    }
}

fn validate(record: &NewThermalRecord) -> Result<()> {
    if record.name.trim().is_empty() {
        return Err(AgriError::invalid_input("Record name is required"));
    }
    for (label, value) in [
        ("bodyTemp", record.body_temp),
        ("avgTemp", record.avg_temp),
        ("minTemp", record.min_temp),
    ] {
        if !value.is_finite() {
            return Err(AgriError::invalid_input(format!("{label} must be a number")));
        }
    }
    Ok(())
}

/// `None` for a missing or `all` filter
fn parse_filter(raw: Option<&str>, label: &str) -> Result<Option<i32>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AgriError::invalid_input(format!("Invalid {label} filter '{value}'"))),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Display form: one-decimal temperatures, `N/A` for missing ambient values
pub fn format_record<Tz: TimeZone>(record: &ThermalRecord, tz: &Tz) -> FormattedThermalRecord
where
    Tz::Offset: std::fmt::Display,
{
    let local = record.scanned_at.with_timezone(tz);
    let or_na = |value: Option<f64>| {
        value
            .filter(|v| *v != 0.0)
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "N/A".to_string())
    };

    FormattedThermalRecord {
        id: record.id,
        name: record.name.clone(),
        body_temp: format!("{:.1}", record.body_temp),
        avg_temp: format!("{:.1}", record.avg_temp),
        min_temp: format!("{:.1}", record.min_temp),
        weight: record.weight.clone(),
        age: record.age.clone(),
        breed: record.breed.clone(),
        last_fed: record.last_fed.clone(),
        ambient_temp: or_na(record.ambient_temp),
        humidity: or_na(record.humidity),
        health_status: record.health_status,
        notes: record
            .notes
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "No observations recorded".to_string()),
        date: local.format("%b %-d, %Y").to_string(),
        time: local.format("%I:%M %p").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NewThermalRecord {
        NewThermalRecord {
            name: "Babe-7".to_string(),
            body_temp: 39.8,
            avg_temp: 39.2,
            min_temp: 38.7,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_derives_health_status() {
        let service = ThermalService::new(Database::in_memory().await.unwrap());
        let saved = service.create(record()).await.unwrap();
        assert_eq!(saved.health_status, HealthStatus::Elevated);
    }

    #[tokio::test]
    async fn test_sensor_record_uses_max_then_avg() {
        let service = ThermalService::new(Database::in_memory().await.unwrap());
        let saved = service
            .create_from_sensor(SensorThermalReading {
                max_temp: None,
                min_temp: None,
                avg_temp: 40.2,
            })
            .await
            .unwrap();

        assert_eq!(saved.name, "Auto-detected");
        assert_eq!(saved.body_temp, 40.2);
        assert_eq!(saved.min_temp, 40.2);
        assert_eq!(saved.health_status, HealthStatus::FeverAlert);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let service = ThermalService::new(Database::in_memory().await.unwrap());
        service.create(record()).await.unwrap();
        service
            .create(NewThermalRecord {
                name: "Wilbur-1".to_string(),
                body_temp: 38.4,
                ..record()
            })
            .await
            .unwrap();

        let by_name = service
            .list(&ThermalFilter {
                search: Some("wilbur".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].body_temp, "38.4");
        assert_eq!(by_name[0].ambient_temp, "N/A");
        assert_eq!(by_name[0].notes, "No observations recorded");

        let by_temp = service
            .list(&ThermalFilter {
                search: Some("39.8".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_temp.len(), 1);

        let all = service
            .list(&ThermalFilter {
                month: Some("all".to_string()),
                year: Some(Local::now().year().to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        assert!(service
            .list(&ThermalFilter {
                month: Some("13".to_string()),
                ..Default::default()
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_simulated_scan_is_plausible() {
        let service = ThermalService::new(Database::in_memory().await.unwrap());
        let scan = service.simulate_scan().await.unwrap();
        assert!((37.5..=40.5).contains(&scan.body_temp));
        assert!(scan.min_temp < scan.body_temp);
        assert_eq!(scan.health_status, HealthStatus::from_body_temp(scan.body_temp));
    }
}

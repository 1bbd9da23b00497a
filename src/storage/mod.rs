//! Relational store for readings, sessions, notifications, users and scans
//!
//! SQLite through `sqlx`. The schema is created on connect. Timestamps are
//! fixed-width RFC 3339 UTC strings so text comparison orders them
//! chronologically.

pub mod misting;
pub mod notifications;
pub mod readings;
pub mod thermal;
pub mod users;

use crate::config::DatabaseConfig;
use crate::error::{AgriError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// Shared handle to the store
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database and apply the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Opening database at {}", config.url);

        let in_memory = is_memory_url(&config.url);
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AgriError::config(format!("Invalid database URL '{}': {e}", config.url)))?
            .create_if_missing(true);

        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        // Every connection to `:memory:` is a separate database
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AgriError::database(format!("Failed to open database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Fresh in-memory database, used by offline runs and tests
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// `SELECT 1` round trip for the health endpoint
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AgriError::database(format!("Ping failed: {e}")))?;
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        const SCHEMA: &[&str] = &[
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fullname TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'client',
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sensor_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                temperature REAL,
                humidity REAL,
                water_level INTEGER,
                pump_on INTEGER NOT NULL,
                captured_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_readings_captured
                ON sensor_readings(captured_at)",
            "CREATE TABLE IF NOT EXISTS misting_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                start_temperature REAL,
                start_humidity REAL,
                start_heat_index REAL,
                start_water_level INTEGER,
                end_temperature REAL,
                end_humidity REAL,
                end_heat_index REAL,
                end_water_level INTEGER,
                mode TEXT NOT NULL DEFAULT 'AUTO'
            )",
            "CREATE INDEX IF NOT EXISTS idx_sessions_started
                ON misting_sessions(started_at)",
            "CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                temperature REAL,
                humidity REAL,
                heat_index REAL,
                water_level INTEGER,
                pump_status INTEGER NOT NULL,
                mode TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_notifications_created
                ON notifications(created_at)",
            "CREATE TABLE IF NOT EXISTS thermal_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                body_temp REAL NOT NULL,
                avg_temp REAL NOT NULL,
                min_temp REAL NOT NULL,
                weight TEXT,
                age TEXT,
                breed TEXT,
                last_fed TEXT,
                ambient_temp REAL,
                humidity REAL,
                health_status TEXT NOT NULL DEFAULT 'Healthy',
                notes TEXT,
                scanned_at TEXT NOT NULL
            )",
        ];

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AgriError::database(format!("Schema migration failed: {e}")))?;
        }

        debug!("Database schema ready");
        Ok(())
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Encode a timestamp for storage
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored timestamp
pub(crate) fn decode_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AgriError::database(format!("Corrupt timestamp '{raw}': {e}")))
}

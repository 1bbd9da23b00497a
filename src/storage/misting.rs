use super::{decode_ts, encode_ts, Database};
use crate::climate::MetricsSnapshot;
use crate::error::{AgriError, Result};
use crate::models::{MistingMode, MistingSession};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

const SESSION_COLUMNS: &str = "id, started_at, ended_at,
    start_temperature, start_humidity, start_heat_index, start_water_level,
    end_temperature, end_humidity, end_heat_index, end_water_level, mode";

impl Database {
    pub async fn insert_session(
        &self,
        started_at: DateTime<Utc>,
        metrics: MetricsSnapshot,
        mode: MistingMode,
    ) -> Result<MistingSession> {
        let result = sqlx::query(
            "INSERT INTO misting_sessions
                (started_at, start_temperature, start_humidity, start_heat_index, start_water_level, mode)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(encode_ts(&started_at))
        .bind(metrics.temperature)
        .bind(metrics.humidity)
        .bind(metrics.heat_index)
        .bind(metrics.water_level)
        .bind(mode.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to open misting session: {e}")))?;

        Ok(MistingSession {
            id: result.last_insert_rowid(),
            started_at,
            ended_at: None,
            start_metrics: metrics,
            end_metrics: None,
            mode,
        })
    }

    pub async fn find_session(&self, id: i64) -> Result<Option<MistingSession>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM misting_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to load session {id}: {e}")))?;

        row.as_ref().map(row_to_session).transpose()
    }

    /// The session that has not been ended yet, if any
    pub async fn open_session(&self) -> Result<Option<MistingSession>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM misting_sessions
             WHERE ended_at IS NULL ORDER BY started_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to load open session: {e}")))?;

        row.as_ref().map(row_to_session).transpose()
    }

    /// Close a session that is still open
    ///
    /// Returns `None` when no open session has this id; nothing is written
    /// in that case.
    pub async fn close_session(
        &self,
        id: i64,
        ended_at: DateTime<Utc>,
        metrics: MetricsSnapshot,
    ) -> Result<Option<MistingSession>> {
        let result = sqlx::query(
            "UPDATE misting_sessions
             SET ended_at = ?, end_temperature = ?, end_humidity = ?, end_heat_index = ?, end_water_level = ?
             WHERE id = ? AND ended_at IS NULL",
        )
        .bind(encode_ts(&ended_at))
        .bind(metrics.temperature)
        .bind(metrics.humidity)
        .bind(metrics.heat_index)
        .bind(metrics.water_level)
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to close session {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_session(id).await
    }

    /// Sessions started at or after `since`, newest first
    pub async fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<MistingSession>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM misting_sessions
             WHERE started_at >= ? ORDER BY started_at DESC, id DESC"
        ))
        .bind(encode_ts(&since))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to list sessions: {e}")))?;

        rows.iter().map(row_to_session).collect()
    }

    /// Sessions started in `[from, to)`, oldest first
    pub async fn sessions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MistingSession>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM misting_sessions
             WHERE started_at >= ? AND started_at < ? ORDER BY started_at ASC, id ASC"
        ))
        .bind(encode_ts(&from))
        .bind(encode_ts(&to))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to list sessions: {e}")))?;

        rows.iter().map(row_to_session).collect()
    }

    /// Most recent sessions, newest first
    pub async fn recent_sessions(&self, limit: u32) -> Result<Vec<MistingSession>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM misting_sessions
             ORDER BY started_at DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to list sessions: {e}")))?;

        rows.iter().map(row_to_session).collect()
    }
}

fn row_to_session(row: &SqliteRow) -> Result<MistingSession> {
    let started_at: String = row.try_get("started_at")?;
    let ended_at: Option<String> = row.try_get("ended_at")?;
    let raw_mode: String = row.try_get("mode")?;
    let mode: MistingMode = raw_mode.parse().map_err(|_| {
        AgriError::database(format!("Unreadable misting mode '{raw_mode}' in stored session"))
    })?;

    let start_metrics = MetricsSnapshot {
        temperature: row.try_get("start_temperature")?,
        humidity: row.try_get("start_humidity")?,
        heat_index: row.try_get("start_heat_index")?,
        water_level: row.try_get("start_water_level")?,
    };

    let end_metrics = match ended_at {
        Some(_) => Some(MetricsSnapshot {
            temperature: row.try_get("end_temperature")?,
            humidity: row.try_get("end_humidity")?,
            heat_index: row.try_get("end_heat_index")?,
            water_level: row.try_get("end_water_level")?,
        }),
        None => None,
    };

    Ok(MistingSession {
        id: row.try_get("id")?,
        started_at: decode_ts(&started_at)?,
        ended_at: ended_at.as_deref().map(decode_ts).transpose()?,
        start_metrics,
        end_metrics,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_only_touches_open_sessions() {
        let db = Database::in_memory().await.unwrap();
        let started = Utc::now();
        let session = db
            .insert_session(started, MetricsSnapshot::default(), MistingMode::Manual)
            .await
            .unwrap();

        assert_eq!(db.open_session().await.unwrap().map(|s| s.id), Some(session.id));
        assert!(db
            .close_session(session.id + 1, Utc::now(), MetricsSnapshot::default())
            .await
            .unwrap()
            .is_none());

        let closed = db
            .close_session(session.id, Utc::now(), MetricsSnapshot::default())
            .await
            .unwrap()
            .unwrap();
        assert!(!closed.is_open());
        assert_eq!(closed.mode, MistingMode::Manual);

        assert!(db.open_session().await.unwrap().is_none());
        assert!(db
            .close_session(session.id, Utc::now(), MetricsSnapshot::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_corrupt_mode_is_a_database_error() {
        let db = Database::in_memory().await.unwrap();
        let session = db
            .insert_session(Utc::now(), MetricsSnapshot::default(), MistingMode::Auto)
            .await
            .unwrap();
        sqlx::query("UPDATE misting_sessions SET mode = 'TURBO' WHERE id = ?")
            .bind(session.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.find_session(session.id).await.unwrap_err();
        assert!(matches!(err, AgriError::Database(_)));
    }
}

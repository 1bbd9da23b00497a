use super::{decode_ts, encode_ts, Database};
use crate::climate::MetricsSnapshot;
use crate::error::{AgriError, Result};
use crate::models::{NewNotification, Notification};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

impl Database {
    pub async fn insert_notification(
        &self,
        notification: NewNotification,
        created_at: DateTime<Utc>,
    ) -> Result<Notification> {
        let snapshot = notification.snapshot;
        let result = sqlx::query(
            "INSERT INTO notifications
                (kind, message, temperature, humidity, heat_index, water_level, pump_status, mode, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(snapshot.temperature)
        .bind(snapshot.humidity)
        .bind(snapshot.heat_index)
        .bind(snapshot.water_level)
        .bind(notification.pump_status)
        .bind(notification.mode.as_str())
        .bind(encode_ts(&created_at))
        .execute(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to store notification: {e}")))?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            kind: notification.kind,
            message: notification.message,
            snapshot,
            pump_status: notification.pump_status,
            mode: notification.mode,
            is_read: false,
            created_at,
        })
    }

    /// Newest first
    pub async fn list_notifications(&self, limit: u32) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT id, kind, message, temperature, humidity, heat_index, water_level,
                    pump_status, mode, is_read, created_at
             FROM notifications ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to list notifications: {e}")))?;

        rows.iter().map(row_to_notification).collect()
    }

    pub async fn unread_notification_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM notifications WHERE is_read = 0")
            .fetch_one(self.pool())
            .await
            .map_err(|e| AgriError::database(format!("Failed to count notifications: {e}")))?;

        Ok(row.try_get("count")?)
    }

    /// Returns false when no notification has this id
    pub async fn mark_notification_read(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| AgriError::database(format!("Failed to mark notification {id}: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the number of notifications flipped to read
    pub async fn mark_all_notifications_read(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE is_read = 0")
            .execute(self.pool())
            .await
            .map_err(|e| AgriError::database(format!("Failed to mark notifications: {e}")))?;

        Ok(result.rows_affected())
    }

    /// Delete notifications created before `cutoff`
    pub async fn delete_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < ?")
            .bind(encode_ts(&cutoff))
            .execute(self.pool())
            .await
            .map_err(|e| AgriError::database(format!("Failed to prune notifications: {e}")))?;

        Ok(result.rows_affected())
    }
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification> {
    let kind: String = row.try_get("kind")?;
    let mode: String = row.try_get("mode")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Notification {
        id: row.try_get("id")?,
        kind: kind.parse()?,
        message: row.try_get("message")?,
        snapshot: MetricsSnapshot {
            temperature: row.try_get("temperature")?,
            humidity: row.try_get("humidity")?,
            heat_index: row.try_get("heat_index")?,
            water_level: row.try_get("water_level")?,
        },
        pump_status: row.try_get("pump_status")?,
        mode: mode.parse()?,
        is_read: row.try_get("is_read")?,
        created_at: decode_ts(&created_at)?,
    })
}

//! Notification feed

use crate::climate::MetricsSnapshot;
use crate::error::{AgriError, Result};
use crate::models::{MistingMode, NewNotification, Notification, NotificationKind};
use crate::realtime::{RealtimeHub, NOTIFICATION};
use crate::storage::Database;
use chrono::{Duration, Utc};
use tracing::info;

pub struct NotificationService {
    db: Database,
    hub: RealtimeHub,
    default_limit: u32,
}

impl NotificationService {
    pub fn new(db: Database, hub: RealtimeHub, default_limit: u32) -> Self {
        Self {
            db,
            hub,
            default_limit: default_limit.max(1),
        }
    }

    /// Store a notification and push it to connected dashboards
    pub async fn record(
        &self,
        kind: NotificationKind,
        snapshot: MetricsSnapshot,
        pump_status: bool,
        mode: MistingMode,
    ) -> Result<Notification> {
        let notification = self
            .db
            .insert_notification(
                NewNotification {
                    kind,
                    message: notification_message(kind, &snapshot),
                    snapshot,
                    pump_status,
                    mode,
                },
                Utc::now(),
            )
            .await?;

        info!(
            notification_id = notification.id,
            kind = kind.as_str(),
            "{}",
            notification.message
        );
        self.hub.emit(NOTIFICATION, &notification);
        Ok(notification)
    }

    /// Newest first, `limit` defaulting to the configured page size
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<Notification>> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.default_limit);
        self.db.list_notifications(limit).await
    }

    pub async fn unread_count(&self) -> Result<i64> {
        self.db.unread_notification_count().await
    }

    pub async fn mark_read(&self, id: i64) -> Result<()> {
        if self.db.mark_notification_read(id).await? {
            Ok(())
        } else {
            Err(AgriError::not_found(format!("Notification {id} not found")))
        }
    }

    pub async fn mark_all_read(&self) -> Result<u64> {
        self.db.mark_all_notifications_read().await
    }

    /// Delete notifications older than `days`; returns how many went
    pub async fn prune_older_than(&self, days: u32) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let removed = self.db.delete_notifications_before(cutoff).await?;
        if removed > 0 {
            info!("Pruned {removed} notifications older than {days} days");
        }
        Ok(removed)
    }
}

/// Human-readable text stored with each notification
pub fn notification_message(kind: NotificationKind, snapshot: &MetricsSnapshot) -> String {
    let headline = match kind {
        NotificationKind::PumpOn => "Misting pump turned ON automatically",
        NotificationKind::PumpOff => "Misting pump turned OFF automatically",
        NotificationKind::ManualOn => "Misting pump turned ON manually",
        NotificationKind::ManualOff => "Misting pump turned OFF manually",
        NotificationKind::AutoMode => "Switched to AUTO mode",
    };
    format!("{headline}. {}", snapshot.describe())
}

//! Background pruning of old notifications

use crate::services::NotificationService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct NotificationRetention {
    notifications: Arc<NotificationService>,
    retention_days: u32,
    interval: Duration,
}

impl NotificationRetention {
    pub fn new(
        notifications: Arc<NotificationService>,
        retention_days: u32,
        interval: Duration,
    ) -> Self {
        Self {
            notifications,
            retention_days,
            interval,
        }
    }

    /// One prune pass; errors are logged, not returned
    pub async fn run_once(&self) -> u64 {
        match self.notifications.prune_older_than(self.retention_days).await {
            Ok(removed) => {
                debug!(removed, "Notification retention pass finished");
                removed
            }
            Err(e) => {
                crate::log_structured_error!(e, "retention", "prune");
                0
            }
        }
    }

    /// Prune on a fixed interval until `shutdown` flips to true
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Notification retention stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::MetricsSnapshot;
    use crate::models::{MistingMode, NewNotification, NotificationKind};
    use crate::realtime::RealtimeHub;
    use crate::storage::Database;
    use chrono::{Duration as ChronoDuration, Utc};

    #[tokio::test]
    async fn test_run_once_removes_only_expired() {
        let db = Database::in_memory().await.unwrap();
        let service = Arc::new(NotificationService::new(db.clone(), RealtimeHub::default(), 50));

        let note = |kind| NewNotification {
            kind,
            message: "test".to_string(),
            snapshot: MetricsSnapshot::default(),
            pump_status: false,
            mode: MistingMode::Auto,
        };
        db.insert_notification(
            note(NotificationKind::PumpOn),
            Utc::now() - ChronoDuration::days(45),
        )
        .await
        .unwrap();
        db.insert_notification(note(NotificationKind::PumpOff), Utc::now())
            .await
            .unwrap();

        let retention = NotificationRetention::new(service.clone(), 30, Duration::from_secs(3600));
        assert_eq!(retention.run_once().await, 1);
        assert_eq!(service.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_task_stops_on_shutdown() {
        let db = Database::in_memory().await.unwrap();
        let service = Arc::new(NotificationService::new(db, RealtimeHub::default(), 50));
        let (tx, rx) = watch::channel(false);

        let handle =
            NotificationRetention::new(service, 30, Duration::from_secs(3600)).start(rx);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("retention task did not stop")
            .unwrap();
    }
}

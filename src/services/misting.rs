//! Misting session lifecycle

use crate::error::{AgriError, Result};
use crate::models::{EndSession, MistingSession, StartSession};
use crate::storage::Database;
use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::sync::Mutex;
use tracing::info;

/// Sessions returned by the history listing
pub const RECENT_SESSION_LIMIT: u32 = 100;

/// Opens and closes sessions, keeping at most one open at a time
pub struct MistingService {
    db: Database,
    lifecycle: Mutex<()>,
}

impl MistingService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            lifecycle: Mutex::new(()),
        }
    }

    /// Open a session; `Conflict` while another one is still open
    pub async fn start(&self, request: StartSession) -> Result<MistingSession> {
        let _guard = self.lifecycle.lock().await;

        if let Some(open) = self.db.open_session().await? {
            return Err(AgriError::conflict(format!(
                "Misting session {} is still open",
                open.id
            )));
        }

        let mode = request.mode.unwrap_or_default();
        let session = self
            .db
            .insert_session(Utc::now(), request.snapshot(), mode)
            .await?;

        info!(session_id = session.id, mode = %mode, "Misting started");
        Ok(session)
    }

    /// Close the open session with this id
    ///
    /// `NotFound` when the id does not exist or the session is already
    /// closed. No other session is touched.
    pub async fn end(&self, id: i64, request: EndSession) -> Result<MistingSession> {
        let _guard = self.lifecycle.lock().await;

        let session = self
            .db
            .close_session(id, Utc::now(), request.snapshot())
            .await?
            .ok_or_else(|| AgriError::not_found(format!("No open misting session with id {id}")))?;

        info!(
            session_id = session.id,
            minutes = session.duration_minutes(),
            "Misting ended"
        );
        Ok(session)
    }

    pub async fn open_session(&self) -> Result<Option<MistingSession>> {
        self.db.open_session().await
    }

    pub async fn get(&self, id: i64) -> Result<MistingSession> {
        self.db
            .find_session(id)
            .await?
            .ok_or_else(|| AgriError::not_found(format!("Misting session {id} not found")))
    }

    /// Sessions started since local midnight, newest first
    pub async fn today(&self) -> Result<Vec<MistingSession>> {
        self.db.sessions_since(start_of_day(&Local, Utc::now())).await
    }

    /// The last hundred sessions, newest first
    pub async fn recent(&self) -> Result<Vec<MistingSession>> {
        self.db.recent_sessions(RECENT_SESSION_LIMIT).await
    }

    /// Sessions started in `[from, to)`, oldest first
    pub async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MistingSession>> {
        self.db.sessions_between(from, to).await
    }
}

/// Midnight of `now`'s calendar day in `tz`, as UTC
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    local_date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

//! Pump transition correlator
//!
//! Every reading, manual command and mode switch goes through one mutex so
//! that each real pump transition yields exactly one notification and one
//! session open/close, whichever path observed it first.
//!
//! Manual commands and the AUTO switch update `previous_pump` themselves, so
//! the next sensor reading that merely confirms the new state is not treated
//! as another transition.

use crate::client::PumpCommandPublisher;
use crate::climate::MetricsSnapshot;
use crate::error::{AgriError, Result};
use crate::models::{
    EndSession, IngestReading, MistingMode, MistingSession, Notification, NotificationKind,
    SensorReading, StartSession,
};
use crate::realtime::{RealtimeHub, MISTING_ENDED, MISTING_STARTED, MODE_CHANGED, SENSOR_UPDATE};
use crate::services::{AutoController, MistingService, NotificationService};
use crate::storage::Database;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
struct CorrelatorState {
    previous_pump: bool,
    mode: MistingMode,
    last_snapshot: Option<MetricsSnapshot>,
    last_reading_at: Option<DateTime<Utc>>,
    /// Pump state the auto controller has asked for and not yet seen
    pending_auto: Option<bool>,
}

/// A pump transition and what it produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub pump_on: bool,
    pub notification: Notification,
    pub session: Option<MistingSession>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub reading: SensorReading,
    pub heat_index: Option<f64>,
    pub mode: MistingMode,
    pub transition: Option<Transition>,
    /// Pump state requested from the controller by AUTO mode, if any
    pub auto_request: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlOutcome {
    pub mode: MistingMode,
    pub pump_on: bool,
    /// False when the command matched the current state
    pub changed: bool,
    pub notification: Option<Notification>,
    pub session: Option<MistingSession>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatorStatus {
    pub mode: MistingMode,
    pub pump_on: bool,
    pub open_session_id: Option<i64>,
    pub last_snapshot: Option<MetricsSnapshot>,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub controller_connected: bool,
}

pub struct PumpCorrelator {
    db: Database,
    misting: Arc<MistingService>,
    notifications: Arc<NotificationService>,
    hub: RealtimeHub,
    publisher: Arc<dyn PumpCommandPublisher>,
    auto: AutoController,
    state: Mutex<CorrelatorState>,
}

impl PumpCorrelator {
    pub fn new(
        db: Database,
        misting: Arc<MistingService>,
        notifications: Arc<NotificationService>,
        hub: RealtimeHub,
        publisher: Arc<dyn PumpCommandPublisher>,
        auto: AutoController,
    ) -> Self {
        Self {
            db,
            misting,
            notifications,
            hub,
            publisher,
            auto,
            state: Mutex::new(CorrelatorState::default()),
        }
    }

    /// Seed the pump state from the latest stored reading
    pub async fn restore(&self) -> Result<()> {
        let latest = self.db.latest_reading().await?;
        let mut state = self.state.lock().await;

        if let Some(reading) = latest {
            state.previous_pump = reading.pump_on;
            state.last_snapshot = Some(reading.snapshot());
            state.last_reading_at = Some(reading.captured_at);
            info!(
                pump_on = reading.pump_on,
                "Restored pump state from reading {}", reading.id
            );
        }
        Ok(())
    }

    /// Store a reading and act on any pump transition it reveals
    pub async fn ingest(&self, reading: IngestReading) -> Result<IngestOutcome> {
        let mut state = self.state.lock().await;

        let pump_on = reading.pump_on.unwrap_or(state.previous_pump);
        let stored = self
            .db
            .insert_reading(
                reading.temperature(),
                reading.humidity(),
                reading.water_level(),
                pump_on,
                reading.captured_at.unwrap_or_else(Utc::now),
            )
            .await?;

        let snapshot = stored.snapshot();
        state.last_snapshot = Some(snapshot);
        state.last_reading_at = Some(stored.captured_at);

        self.hub.emit(
            SENSOR_UPDATE,
            &serde_json::json!({
                "reading": stored,
                "heatIndex": snapshot.heat_index,
                "mode": state.mode,
            }),
        );

        let transition = if pump_on != state.previous_pump {
            debug!(
                from = state.previous_pump,
                to = pump_on,
                "Pump transition observed by sensor"
            );
            Some(self.apply_transition(&mut state, pump_on, snapshot).await?)
        } else {
            None
        };

        if state.pending_auto == Some(pump_on) {
            state.pending_auto = None;
        }

        let auto_request = if state.mode == MistingMode::Auto {
            self.evaluate_auto(&mut state, snapshot).await
        } else {
            None
        };

        Ok(IngestOutcome {
            heat_index: snapshot.heat_index,
            reading: stored,
            mode: state.mode,
            transition,
            auto_request,
        })
    }

    /// Operator command: switch the pump and take MANUAL control
    pub async fn manual_control(&self, on: bool) -> Result<ControlOutcome> {
        let mut state = self.state.lock().await;
        let was_manual = state.mode == MistingMode::Manual;

        if state.previous_pump == on {
            if !was_manual {
                self.publisher.publish_mode(MistingMode::Manual).await?;
                self.enter_mode(&mut state, MistingMode::Manual);
            }
            debug!(on, "Manual command matches current pump state");
            return Ok(ControlOutcome {
                mode: state.mode,
                pump_on: on,
                changed: false,
                notification: None,
                session: None,
            });
        }

        // Nothing changes locally unless the controller accepted the command
        self.publisher.publish_pump(on).await?;

        if !was_manual {
            if let Err(e) = self.publisher.publish_mode(MistingMode::Manual).await {
                warn!("Pump command sent but mode update failed: {e}");
            }
            self.enter_mode(&mut state, MistingMode::Manual);
        }

        let snapshot = state.last_snapshot.unwrap_or_default();
        let transition = self.apply_transition(&mut state, on, snapshot).await?;

        info!(on, "Manual pump control applied");
        Ok(ControlOutcome {
            mode: state.mode,
            pump_on: on,
            changed: true,
            notification: Some(transition.notification),
            session: transition.session,
        })
    }

    /// Hand control back to the threshold logic
    pub async fn switch_to_auto(&self) -> Result<ControlOutcome> {
        let mut state = self.state.lock().await;

        if state.mode == MistingMode::Auto {
            return Ok(ControlOutcome {
                mode: MistingMode::Auto,
                pump_on: state.previous_pump,
                changed: false,
                notification: None,
                session: None,
            });
        }

        self.publisher.publish_mode(MistingMode::Auto).await?;
        self.enter_mode(&mut state, MistingMode::Auto);

        let snapshot = state.last_snapshot.unwrap_or_default();
        let notification = self
            .notifications
            .record(
                NotificationKind::AutoMode,
                snapshot,
                state.previous_pump,
                MistingMode::Auto,
            )
            .await?;

        if state.last_snapshot.is_some() {
            self.evaluate_auto(&mut state, snapshot).await;
        }

        info!("Switched to AUTO mode");
        Ok(ControlOutcome {
            mode: MistingMode::Auto,
            pump_on: state.previous_pump,
            changed: true,
            notification: Some(notification),
            session: None,
        })
    }

    pub async fn status(&self) -> Result<CorrelatorStatus> {
        let (mode, pump_on, last_snapshot, last_reading_at) = {
            let state = self.state.lock().await;
            (
                state.mode,
                state.previous_pump,
                state.last_snapshot,
                state.last_reading_at,
            )
        };

        Ok(CorrelatorStatus {
            mode,
            pump_on,
            open_session_id: self.misting.open_session().await?.map(|s| s.id),
            last_snapshot,
            last_reading_at,
            controller_connected: self.publisher.is_connected(),
        })
    }

    /// Feed readings arriving from the broker into `ingest`
    pub fn spawn_ingest_loop(
        self: Arc<Self>,
        mut readings: mpsc::Receiver<IngestReading>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(reading) = readings.recv().await {
                if let Err(e) = self.ingest(reading).await {
                    crate::log_structured_error!(e, "correlator", "ingest");
                }
            }
            debug!("Reading channel closed");
        })
    }

    fn enter_mode(&self, state: &mut CorrelatorState, mode: MistingMode) {
        state.mode = mode;
        state.pending_auto = None;
        self.hub.emit(
            MODE_CHANGED,
            &serde_json::json!({ "mode": mode, "pumpOn": state.previous_pump }),
        );
    }

    /// Session change, notification and state update for one transition
    ///
    /// The session step is idempotent: an open session is adopted and a
    /// missing one is skipped. Until the notification is stored the edge is
    /// not consumed and the next reading replays it.
    async fn apply_transition(
        &self,
        state: &mut CorrelatorState,
        pump_on: bool,
        snapshot: MetricsSnapshot,
    ) -> Result<Transition> {
        let mode = state.mode;

        let session = if pump_on {
            self.open_session(snapshot, mode).await?
        } else {
            self.close_open_session(snapshot).await?
        };

        let kind = NotificationKind::for_transition(pump_on, mode);
        let notification = self
            .notifications
            .record(kind, snapshot, pump_on, mode)
            .await?;
        state.previous_pump = pump_on;

        Ok(Transition {
            pump_on,
            notification,
            session,
        })
    }

    async fn open_session(
        &self,
        snapshot: MetricsSnapshot,
        mode: MistingMode,
    ) -> Result<Option<MistingSession>> {
        match self
            .misting
            .start(StartSession::from_snapshot(snapshot, mode))
            .await
        {
            Ok(session) => {
                self.hub.emit(MISTING_STARTED, &session);
                Ok(Some(session))
            }
            Err(AgriError::Conflict(reason)) => {
                // Opened through the REST API already; adopt it
                debug!("{reason}");
                self.misting.open_session().await
            }
            Err(e) => Err(e),
        }
    }

    async fn close_open_session(&self, snapshot: MetricsSnapshot) -> Result<Option<MistingSession>> {
        let Some(open) = self.misting.open_session().await? else {
            debug!("Pump turned off with no open misting session");
            return Ok(None);
        };

        match self
            .misting
            .end(open.id, EndSession::from_snapshot(snapshot))
            .await
        {
            Ok(session) => {
                self.hub.emit(MISTING_ENDED, &session);
                Ok(Some(session))
            }
            Err(AgriError::NotFound(reason)) => {
                debug!("{reason}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Ask the controller for a pump change when thresholds say so
    async fn evaluate_auto(
        &self,
        state: &mut CorrelatorState,
        snapshot: MetricsSnapshot,
    ) -> Option<bool> {
        let Some(target) = self.auto.decide(&snapshot, state.previous_pump).target() else {
            // Back in the hold band: a lost command may be re-sent next time
            state.pending_auto = None;
            return None;
        };
        if state.pending_auto == Some(target) {
            return None;
        }
        state.pending_auto = None;

        match self.publisher.publish_pump(target).await {
            Ok(()) => {
                info!(
                    target,
                    value = snapshot.control_value(),
                    "Auto control requested pump change"
                );
                state.pending_auto = Some(target);
                Some(target)
            }
            Err(e) => {
                warn!("Auto control could not reach the pump controller: {e}");
                None
            }
        }
    }
}

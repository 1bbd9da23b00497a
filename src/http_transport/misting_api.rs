//! Misting session and pump control endpoints

use super::SharedState;
use crate::error::{AgriError, Result};
use crate::models::{EndSession, MistingSession, StartSession};
use crate::realtime::{MISTING_ENDED, MISTING_STARTED};
use crate::services::{ControlOutcome, CorrelatorStatus};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ManualCommand {
    pub on: bool,
}

/// `POST /api/misting/start`
pub async fn start_session(
    State(state): State<SharedState>,
    Json(request): Json<StartSession>,
) -> Result<(StatusCode, Json<MistingSession>)> {
    let session = state.misting.start(request).await?;
    state.hub.emit(MISTING_STARTED, &session);
    Ok((StatusCode::CREATED, Json(session)))
}

/// `PUT /api/misting/end/:id`; an empty body ends without end metrics
pub async fn end_session(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<MistingSession>> {
    let request = if body.iter().all(|b| b.is_ascii_whitespace()) {
        EndSession::default()
    } else {
        serde_json::from_slice::<EndSession>(&body)?
    };
    let session = state.misting.end(id, request).await?;
    state.hub.emit(MISTING_ENDED, &session);
    Ok(Json(session))
}

pub async fn today(State(state): State<SharedState>) -> Result<Json<Vec<MistingSession>>> {
    Ok(Json(state.misting.today().await?))
}

/// `GET /api/misting/all` and `/api/misting/logs`
pub async fn recent(State(state): State<SharedState>) -> Result<Json<Vec<MistingSession>>> {
    Ok(Json(state.misting.recent().await?))
}

pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MistingSession>> {
    let id: i64 = id
        .parse()
        .map_err(|_| AgriError::invalid_input(format!("Invalid session id '{id}'")))?;
    Ok(Json(state.misting.get(id).await?))
}

/// `POST /api/misting/manual {on}`
pub async fn manual_control(
    State(state): State<SharedState>,
    Json(command): Json<ManualCommand>,
) -> Result<Json<ControlOutcome>> {
    Ok(Json(state.correlator.manual_control(command.on).await?))
}

/// `POST /api/misting/auto`
pub async fn switch_to_auto(State(state): State<SharedState>) -> Result<Json<ControlOutcome>> {
    Ok(Json(state.correlator.switch_to_auto().await?))
}

pub async fn status(State(state): State<SharedState>) -> Result<Json<CorrelatorStatus>> {
    Ok(Json(state.correlator.status().await?))
}

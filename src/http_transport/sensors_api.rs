//! Sensor reading endpoints

use super::SharedState;
use crate::error::Result;
use crate::models::{IngestReading, SensorReading};
use crate::services::IngestOutcome;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

const DEFAULT_READING_LIMIT: u32 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ReadingQuery {
    pub limit: Option<u32>,
}

/// `POST /api/sensors`
pub async fn ingest_reading(
    State(state): State<SharedState>,
    Json(reading): Json<IngestReading>,
) -> Result<(StatusCode, Json<IngestOutcome>)> {
    let outcome = state.correlator.ingest(reading).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/sensors?limit=`, newest first
pub async fn list_readings(
    State(state): State<SharedState>,
    Query(query): Query<ReadingQuery>,
) -> Result<Json<Vec<SensorReading>>> {
    let limit = query.limit.unwrap_or(DEFAULT_READING_LIMIT).max(1);
    Ok(Json(state.db.list_readings(limit).await?))
}

/// `GET /api/sensors/latest`; `null` before the first reading
pub async fn latest_reading(
    State(state): State<SharedState>,
) -> Result<Json<Option<SensorReading>>> {
    Ok(Json(state.db.latest_reading().await?))
}

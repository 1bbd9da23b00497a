//! Thermal scan record endpoints

use super::SharedState;
use crate::error::Result;
use crate::models::{
    FormattedThermalRecord, NewThermalRecord, SensorThermalReading, ThermalFilter, ThermalRecord,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

pub async fn list_records(
    State(state): State<SharedState>,
    Query(filter): Query<ThermalFilter>,
) -> Result<Json<Vec<FormattedThermalRecord>>> {
    Ok(Json(state.thermal.list(&filter).await?))
}

pub async fn create_record(
    State(state): State<SharedState>,
    Json(record): Json<NewThermalRecord>,
) -> Result<(StatusCode, Json<ThermalRecord>)> {
    Ok((StatusCode::CREATED, Json(state.thermal.create(record).await?)))
}

/// `POST /api/records/sensor` from the thermal camera
pub async fn create_sensor_record(
    State(state): State<SharedState>,
    Json(reading): Json<SensorThermalReading>,
) -> Result<(StatusCode, Json<ThermalRecord>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.thermal.create_from_sensor(reading).await?),
    ))
}

pub async fn simulate_scan(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<ThermalRecord>)> {
    Ok((StatusCode::CREATED, Json(state.thermal.simulate_scan().await?)))
}

//! Account endpoints

use super::SharedState;
use crate::error::{AgriError, Result};
use crate::logging::sanitize_payload;
use crate::models::{LoginRequest, SecurityUpdate, SignupRequest, User};
use crate::services::LoginOutcome;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

/// `POST /signup`
pub async fn signup(
    State(state): State<SharedState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = state.users.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Signup successful", "user": user })),
    ))
}

/// `POST /login`
///
/// A failed login is still a 200 carrying `{user: null, message}`.
pub async fn login(
    State(state): State<SharedState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>> {
    Ok(Json(state.users.login(request).await?))
}

pub async fn profile(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<User>> {
    Ok(Json(state.users.get(id).await?))
}

/// `PUT /api/users/:id/security`
pub async fn update_security(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    debug!(user_id = id, payload = %sanitize_payload(&body), "Security update requested");
    let update: SecurityUpdate = serde_json::from_value(body)
        .map_err(|e| AgriError::invalid_input(format!("Invalid security update: {e}")))?;

    let user = state.users.update_security(id, update).await?;
    Ok(Json(
        json!({ "message": "Security settings updated", "user": user }),
    ))
}

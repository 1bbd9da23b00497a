//! Notification feed endpoints

use super::SharedState;
use crate::error::Result;
use crate::models::Notification;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<u32>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(state.notifications.list(query.limit).await?))
}

pub async fn unread_count(State(state): State<SharedState>) -> Result<Json<Value>> {
    let count = state.notifications.unread_count().await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn mark_read(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.notifications.mark_read(id).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

pub async fn mark_all_read(State(state): State<SharedState>) -> Result<Json<Value>> {
    let updated = state.notifications.mark_all_read().await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

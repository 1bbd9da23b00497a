//! Report endpoints

use super::SharedState;
use crate::error::Result;
use crate::services::reports::{Report, ReportQuery};
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Local;

/// `GET /api/reports?period=&date=&year=&month=`
pub async fn report(
    State(state): State<SharedState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>> {
    let period = state.reports.period_for(&query)?;
    Ok(Json(state.reports.generate(period).await?))
}

/// Same report as plain text, served as an attachment
pub async fn download(
    State(state): State<SharedState>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse> {
    let period = state.reports.period_for(&query)?;
    let report = state.reports.generate(period).await?;

    let now = Local::now();
    let body = report.render_text(&now.format("%Y-%m-%d %H:%M:%S").to_string());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report.download_filename(now.date_naive())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

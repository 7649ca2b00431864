//! Export job routes.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::{ExportFormat, ExportJob};

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of jobs to return (default 50)
    pub limit: Option<usize>,
}

/// Create the export router
pub fn export_router() -> Router<AppState> {
    Router::new()
        .route("/history", get(export_history))
        .route("/status/{export_id}", get(export_status))
        .route("/{format}", post(create_export))
}

/// POST /export/{format} - Queue an export of meter readings
#[utoipa::path(
    post,
    path = "/export/{format}",
    tag = "Export",
    params(
        ("format" = String, Path, description = "csv, excel or pdf")
    ),
    responses(
        (status = 200, description = "Export queued", body = ExportJob),
        (status = 400, description = "Unsupported format"),
        (status = 429, description = "Export rate limit exceeded")
    )
)]
pub async fn create_export(
    State(state): State<AppState>,
    Path(format): Path<String>,
) -> Result<Json<ExportJob>, ApiError> {
    let format = match format.to_lowercase().as_str() {
        "csv" => ExportFormat::Csv,
        "excel" => ExportFormat::Excel,
        "pdf" => ExportFormat::Pdf,
        other => {
            return Err(ApiError::bad_request(format!(
                "Unsupported export format: {}",
                other
            )));
        }
    };

    Ok(Json(state.exports.submit(format).await))
}

/// GET /export/status/{export_id} - Progress of one export job
#[utoipa::path(
    get,
    path = "/export/status/{export_id}",
    tag = "Export",
    params(
        ("export_id" = String, Path, description = "Export job ID")
    ),
    responses(
        (status = 200, description = "Export job", body = ExportJob),
        (status = 404, description = "Export job not found"),
        (status = 429, description = "Export rate limit exceeded")
    )
)]
pub async fn export_status(
    State(state): State<AppState>,
    Path(export_id): Path<String>,
) -> Result<Json<ExportJob>, ApiError> {
    state
        .exports
        .get(&export_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::new(axum::http::StatusCode::NOT_FOUND, "Export job not found"))
}

/// GET /export/history - Recent export jobs, newest first
#[utoipa::path(
    get,
    path = "/export/history",
    tag = "Export",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recent export jobs", body = Vec<ExportJob>),
        (status = 429, description = "Export rate limit exceeded")
    )
)]
pub async fn export_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<ExportJob>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.exports.history(limit).await)
}

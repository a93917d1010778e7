use crate::dtos::ImportJobStatusResponse;
use crate::error::AppError;
use crate::middleware::WorkspaceContext;
use crate::models::Period;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// `POST /api/imports/:month`: accept a monthly CSV upload and start an
/// asynchronous import for the caller's workspace. Responds `202 Accepted`
/// with the claimed job; `409` when an import is already processing.
pub async fn import_month(
    State(state): State<AppState>,
    workspace: WorkspaceContext,
    Path(month): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let period = parse_period(&month)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e)))?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    let job = state
        .import
        .enqueue(&workspace.workspace_id, period, data, &state.import_queue)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ImportJobStatusResponse::from_job(job, period)),
    ))
}

/// `GET /api/imports/months/:month/status`: current job status for the
/// caller's workspace; absent jobs report the `not_found` state.
pub async fn import_status(
    State(state): State<AppState>,
    workspace: WorkspaceContext,
    Path(month): Path<String>,
) -> Result<Json<ImportJobStatusResponse>, AppError> {
    let period = parse_period(&month)?;

    let job = state
        .jobs
        .get_status(&workspace.workspace_id, period)
        .await?;

    Ok(Json(ImportJobStatusResponse::from_job(job, period)))
}

fn parse_period(month: &str) -> Result<Period, AppError> {
    month
        .parse()
        .map_err(|e: crate::models::ParsePeriodError| AppError::BadRequest(anyhow::anyhow!(e)))
}

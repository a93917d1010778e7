use crate::dtos::{MonthlyStatisticsResponse, StatisticsParams};
use crate::error::AppError;
use crate::middleware::WorkspaceContext;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Query, State},
};

/// `GET /api/statistics?date=YYYY-MM&group_by=category|iban|summary`:
/// grouped monthly statistics, gated on the period's import having
/// completed. Responds `409` while the period is not ready.
pub async fn monthly_statistics(
    State(state): State<AppState>,
    workspace: WorkspaceContext,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<MonthlyStatisticsResponse>, AppError> {
    let rows = state
        .statistics
        .monthly_statistics(&workspace.workspace_id, params.date, params.group_by)
        .await?;

    Ok(Json(MonthlyStatisticsResponse {
        workspace_id: workspace.workspace_id,
        month: params.date,
        grouped_by: params.group_by,
        rows: rows.into_iter().map(Into::into).collect(),
    }))
}

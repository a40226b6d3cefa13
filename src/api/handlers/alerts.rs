use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::alert_repo;
use crate::errors::AppError;
use crate::models::SuspiciousTradeRow;
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct AlertListParams {
    pub limit: Option<i64>,
    pub alerts_only: Option<bool>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 500)
}

/// GET /api/alerts — scored trades across all markets, most suspicious first.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> Result<Json<ApiResponse<Vec<SuspiciousTradeRow>>>, AppError> {
    let rows = alert_repo::ranked(
        &state.db,
        clamp_limit(params.limit),
        params.alerts_only.unwrap_or(false),
    )
    .await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(rows),
        error: None,
    }))
}

/// GET /api/markets/{market_id}/alerts — scored trades for one market.
pub async fn for_market(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Query(params): Query<AlertListParams>,
) -> Result<Json<ApiResponse<Vec<SuspiciousTradeRow>>>, AppError> {
    let rows =
        alert_repo::ranked_for_market(&state.db, &market_id, clamp_limit(params.limit)).await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(rows),
        error: None,
    }))
}

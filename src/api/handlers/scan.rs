use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppError;
use crate::services::ScanReport;
use crate::AppState;

use super::alerts::ApiResponse;

/// POST /api/scan/{market_id} — run a scan now and return the ranked result.
pub async fn trigger(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<ApiResponse<ScanReport>>, AppError> {
    tracing::info!(market = %market_id, "on-demand scan requested");
    let report = state.scanner.scan_market(&market_id).await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(report),
        error: None,
    }))
}

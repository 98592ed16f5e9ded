//! Dashboard handler

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use finsight_core::health::score;
use finsight_core::{FinancialSnapshot, HealthScore};

use super::NO_DATA_MESSAGE;
use crate::{AppError, AppState};

/// Response for GET /api/dashboard
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub data: FinancialSnapshot,
    pub health_score: HealthScore,
}

/// GET /api/dashboard - The session's snapshot with its health score
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let snapshot = match state.sessions.session_id(&headers) {
        Some(id) => state.sessions.snapshot(&id).await,
        None => None,
    }
    .ok_or_else(|| AppError::bad_request(NO_DATA_MESSAGE))?;

    let health_score = score(&snapshot.report);
    Ok(Json(DashboardResponse {
        success: true,
        data: snapshot,
        health_score,
    }))
}

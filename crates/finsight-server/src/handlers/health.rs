//! Liveness and narrative backend status

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use finsight_core::NarrativeBackend;

use crate::AppState;

/// Narrative backend status
#[derive(Debug, Serialize)]
pub struct AiStatus {
    pub configured: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Response for GET /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_sessions: usize,
    pub ai: AiStatus,
}

/// GET /api/health - Liveness plus narrative backend status
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ai = match &state.narrator {
        Some(client) => AiStatus {
            configured: true,
            healthy: client.health_check().await,
            model: Some(client.model().to_string()),
            host: Some(client.host().to_string()),
        },
        None => AiStatus {
            configured: false,
            healthy: false,
            model: None,
            host: None,
        },
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.active_count().await,
        ai,
    })
}

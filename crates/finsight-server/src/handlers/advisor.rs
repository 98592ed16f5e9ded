//! Advisor handlers: narrative analysis and chat
//!
//! Both work against the snapshot stored in the caller's session.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, response::Response, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::pipeline::{analyze, build_snapshot, chat};
use finsight_core::{HealthScore, InputSource, NarrativeSource};

use super::{with_session_cookie, NO_DATA_MESSAGE};
use crate::{ApiJson, AppError, AppState};

/// Longest chat message accepted
const MAX_MESSAGE_CHARS: usize = 2000;

/// Response for POST /api/analyze
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
    pub health_score: HealthScore,
    pub narrative_source: NarrativeSource,
}

/// POST /api/analyze - Narrative analysis of the session's snapshot
pub async fn analyze_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let snapshot = match state.sessions.session_id(&headers) {
        Some(id) => state.sessions.snapshot(&id).await,
        None => None,
    }
    .ok_or_else(|| AppError::bad_request(NO_DATA_MESSAGE))?;

    let outcome = analyze(&snapshot, state.narrator.as_ref()).await;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis: outcome.narrative,
        health_score: outcome.score,
        narrative_source: outcome.narrative_source,
    }))
}

/// Request body for POST /api/chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Response for POST /api/chat
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

/// POST /api/chat - Ask the advisor a question
///
/// Works without submitted data (the advisor then sees empty figures).
/// The exchange is appended to the session's history.
pub async fn chat_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Response, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("Message cannot be empty"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::bad_request(&format!(
            "Message too long. Maximum is {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let session_id = state.sessions.resolve(&headers);
    let snapshot = state
        .sessions
        .snapshot(&session_id)
        .await
        .unwrap_or_else(|| build_snapshot(&[], InputSource::Records, None));
    let history = state.sessions.history(&session_id).await;
    debug!(session = %session_id, turns = history.len(), "Chat message received");

    let reply = chat(&snapshot, &history, message, state.narrator.as_ref()).await;
    if reply.source == NarrativeSource::Ai {
        state
            .sessions
            .record_exchange(&session_id, message, &reply.response)
            .await;
    }

    Ok(with_session_cookie(
        &state,
        &session_id,
        Json(ChatResponse {
            success: true,
            response: reply.response,
        }),
    ))
}

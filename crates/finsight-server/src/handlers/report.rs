//! One-shot report handler (stateless)

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use finsight_core::import::{normalize_rows, RawRow};
use finsight_core::pipeline::{analyze, build_snapshot, AnalysisOutcome};
use finsight_core::InputSource;

use crate::{ApiJson, AppError, AppState};

/// Request body for POST /api/report
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub records: Vec<RawRow>,
    /// Optional label such as "March 2025"
    #[serde(default)]
    pub month: Option<String>,
}

/// POST /api/report - Metrics, score and narrative for a list of records
///
/// Any invalid row rejects the request with 400. A failing narrative service
/// never fails the request; the rule-based narrative is returned instead.
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ReportRequest>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let records = normalize_rows(&req.records)?;
    let snapshot = build_snapshot(&records, InputSource::Records, req.month);

    let outcome = analyze(&snapshot, state.narrator.as_ref()).await;
    info!(
        records = records.len(),
        score = outcome.score.value,
        "Report generated"
    );

    Ok(Json(outcome))
}

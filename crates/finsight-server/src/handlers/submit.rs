//! Data submission handlers: manual entry form and CSV upload
//!
//! Both store the resulting snapshot in the caller's session.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use serde::Serialize;
use tracing::info;

use finsight_core::import::{parse_csv, records_from_manual, ManualEntry};
use finsight_core::pipeline::build_snapshot;
use finsight_core::{FinancialSnapshot, InputSource};

use super::with_session_cookie;
use crate::{ApiJson, AppError, AppState, MAX_UPLOAD_SIZE};

/// Response for both submission endpoints
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub data: FinancialSnapshot,
}

/// POST /api/process-manual - Submit the manual entry form
pub async fn process_manual(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(entry): ApiJson<ManualEntry>,
) -> Result<Response, AppError> {
    let records = records_from_manual(&entry)?;
    let snapshot = build_snapshot(&records, InputSource::Manual, entry.month.clone());

    store_and_respond(&state, &headers, snapshot, "Data processed successfully!").await
}

/// POST /api/process-csv - Upload a `Category,Amount` CSV
///
/// Expects multipart form with:
/// - file: CSV file (required, must end in .csv, max 16MB)
/// - month: label for the data (optional)
pub async fn process_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut month: Option<String> = None;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                // Check file size limit
                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                file = Some((filename, bytes.to_vec()));
            }
            "month" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read month"))?;
                month = Some(value);
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| AppError::bad_request("No file uploaded"))?;

    // Delegate to core upload logic
    process_csv_core(&state, &headers, &filename, &data, month).await
}

/// Core upload logic - separated from multipart form parsing for testability
pub async fn process_csv_core(
    state: &AppState,
    headers: &HeaderMap,
    filename: &str,
    data: &[u8],
    month: Option<String>,
) -> Result<Response, AppError> {
    if filename.trim().is_empty() {
        return Err(AppError::bad_request("No file selected"));
    }
    if !filename.to_lowercase().ends_with(".csv") {
        return Err(AppError::bad_request("Please upload a CSV file"));
    }

    let records = parse_csv(data)?;
    info!(filename = %filename, records = records.len(), "CSV upload parsed");
    let snapshot = build_snapshot(&records, InputSource::Csv, month);

    store_and_respond(state, headers, snapshot, "CSV processed successfully!").await
}

async fn store_and_respond(
    state: &AppState,
    headers: &HeaderMap,
    snapshot: FinancialSnapshot,
    message: &str,
) -> Result<Response, AppError> {
    let session_id = state.sessions.resolve(headers);
    state
        .sessions
        .store_snapshot(&session_id, snapshot.clone())
        .await;

    Ok(with_session_cookie(
        state,
        &session_id,
        Json(SubmitResponse {
            success: true,
            message: message.to_string(),
            data: snapshot,
        }),
    ))
}

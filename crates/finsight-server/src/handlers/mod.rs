//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod advisor;
pub mod dashboard;
pub mod health;
pub mod report;
pub mod submit;

// Re-export all handlers for use in router
pub use advisor::*;
pub use dashboard::*;
pub use health::*;
pub use report::*;
pub use submit::*;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use crate::AppState;

/// Message for endpoints that need submitted data
pub const NO_DATA_MESSAGE: &str = "No financial data found. Please enter data first.";

/// Attach the signed session cookie to a response
pub(crate) fn with_session_cookie(
    state: &AppState,
    session_id: &str,
    body: impl IntoResponse,
) -> Response {
    let mut response = body.into_response();
    if let Some(cookie) = state.sessions.cookie_header(session_id) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

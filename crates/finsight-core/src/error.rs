//! Error types for Finsight

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed user input: bad row, missing header, unsupported upload.
    /// The message is safe to show to the user.
    #[error("{0}")]
    Validation(String),

    /// The narrative service failed (unreachable, timed out, rate limited,
    /// or returned something unusable)
    #[error("Narrative service error: {0}")]
    Service(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Build a validation error pointing at a 1-based input row
    pub fn invalid_row(row: usize, reason: impl std::fmt::Display) -> Self {
        Error::Validation(format!("Row {}: {}", row, reason))
    }

    /// Whether this error is the user's fault (maps to 400 in the API)
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Csv(_))
    }

    /// Whether this error came from the narrative service
    pub fn is_service(&self) -> bool {
        matches!(self, Error::Service(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

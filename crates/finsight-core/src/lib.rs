//! Finsight Core Library
//!
//! Shared functionality for the Finsight personal finance advisor:
//! - Input normalization for raw rows, manual entry and CSV uploads
//! - Metrics aggregation (income, expenses, savings, category shares)
//! - Rule-based financial health scoring
//! - Pluggable narrative backends for the hosted advisor model
//! - Prompt library for customizable advisor prompts
//! - Rule-based fallback advice

pub mod advice;
pub mod ai;
pub mod error;
pub mod health;
pub mod import;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prompts;

/// Test utilities including mock completion server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{MockBackend, NarrativeBackend, NarrativeClient, OpenAICompatibleBackend};
pub use error::{Error, Result};
pub use models::{
    AggregateReport, Band, ChatRole, ChatTurn, FinancialSnapshot, HealthScore, InputSource,
    NarrativeSource, Record, ScoreBreakdown,
};
pub use pipeline::{AnalysisOutcome, ChatReply};
pub use prompts::{Prompt, PromptId, PromptLibrary};

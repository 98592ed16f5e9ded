//! Pluggable narrative backend abstraction
//!
//! Turns a scored snapshot into advisory prose by calling a hosted
//! text-generation service.
//!
//! # Architecture
//!
//! - `NarrativeBackend` trait: defines the interface for all backends
//! - `NarrativeClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let narrator = NarrativeClient::from_env();
//!
//! if let Some(ref client) = narrator {
//!     let text = client.analyze(&snapshot, &score).await?;
//!     println!("{}", text);
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `FINSIGHT_AI_BACKEND`: Backend to use (openai_compatible, mock). Default: openai_compatible
//! - `FINSIGHT_AI_API_KEY`: API key (required for openai_compatible)
//! - `FINSIGHT_AI_HOST`: Server URL (default: https://api.groq.com/openai)
//! - `FINSIGHT_AI_MODEL`: Model name (default: llama-3.1-8b-instant)

mod mock;
mod openai_compatible;

pub use mock::MockBackend;
pub use openai_compatible::OpenAICompatibleBackend;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::advice::{format_money, CURRENCY_SYMBOL};
use crate::error::Result;
use crate::models::{ChatTurn, FinancialSnapshot, HealthScore};

/// Chat turns sent along with a new question
pub const MAX_CHAT_HISTORY: usize = 12;

/// Key expenses listed in the chat context
const KEY_EXPENSE_COUNT: usize = 5;

/// Trait defining the interface for all narrative backends
///
/// Failures surface as `Error::Service`; callers decide on fallbacks.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Write an advisory report for a snapshot
    async fn analyze(&self, snapshot: &FinancialSnapshot, score: &HealthScore) -> Result<String>;

    /// Answer a question in the context of a snapshot and prior turns
    async fn chat(
        &self,
        snapshot: &FinancialSnapshot,
        score: &HealthScore,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete narrative client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum NarrativeClient {
    /// Hosted OpenAI-style chat completions API (Groq by default)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl NarrativeClient {
    /// Create a narrative client from environment variables
    ///
    /// Checks `FINSIGHT_AI_BACKEND` to determine which backend to use:
    /// - `openai_compatible` (default): needs `FINSIGHT_AI_API_KEY`
    /// - `mock`: canned responses, no network
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("FINSIGHT_AI_BACKEND")
            .unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "groq" => {
                OpenAICompatibleBackend::from_env().map(NarrativeClient::OpenAICompatible)
            }
            "mock" => Some(NarrativeClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown FINSIGHT_AI_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env().map(NarrativeClient::OpenAICompatible)
            }
        }
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str, api_key: &str) -> Self {
        NarrativeClient::OpenAICompatible(OpenAICompatibleBackend::with_api_key(
            host, model, api_key,
        ))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        NarrativeClient::Mock(MockBackend::new())
    }
}

// Implement NarrativeBackend for NarrativeClient by delegating to the inner backend
#[async_trait]
impl NarrativeBackend for NarrativeClient {
    async fn analyze(&self, snapshot: &FinancialSnapshot, score: &HealthScore) -> Result<String> {
        match self {
            NarrativeClient::OpenAICompatible(b) => b.analyze(snapshot, score).await,
            NarrativeClient::Mock(b) => b.analyze(snapshot, score).await,
        }
    }

    async fn chat(
        &self,
        snapshot: &FinancialSnapshot,
        score: &HealthScore,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String> {
        match self {
            NarrativeClient::OpenAICompatible(b) => {
                b.chat(snapshot, score, history, question).await
            }
            NarrativeClient::Mock(b) => b.chat(snapshot, score, history, question).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            NarrativeClient::OpenAICompatible(b) => b.health_check().await,
            NarrativeClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            NarrativeClient::OpenAICompatible(b) => b.model(),
            NarrativeClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            NarrativeClient::OpenAICompatible(b) => b.host(),
            NarrativeClient::Mock(b) => b.host(),
        }
    }
}

/// Prompt template variables describing a snapshot and its score
pub fn summary_vars(
    snapshot: &FinancialSnapshot,
    score: &HealthScore,
) -> HashMap<&'static str, String> {
    let report = &snapshot.report;
    let mut vars = HashMap::new();

    vars.insert("currency", CURRENCY_SYMBOL.to_string());
    vars.insert("month", snapshot.month.clone());
    vars.insert("income", format_money(report.total_income, 2));
    vars.insert("total_expenses", format_money(report.total_expense, 2));
    vars.insert("savings", format_money(report.total_savings, 2));
    vars.insert(
        "savings_rate",
        format!("{:.2}%", report.savings_rate_percent()),
    );
    vars.insert("health_score", score.value.to_string());
    vars.insert("health_band", score.band.to_string());

    // Largest first, zero rows dropped
    let mut expenses: Vec<(&String, &f64)> = report
        .category_totals
        .iter()
        .filter(|(_, amount)| **amount > 0.0)
        .collect();
    expenses.sort_by(|a, b| b.1.total_cmp(a.1));

    let breakdown = if expenses.is_empty() {
        "- No expenses recorded".to_string()
    } else {
        expenses
            .iter()
            .map(|(category, amount)| {
                format!(
                    "- {}: {} ({:.1}% of income)",
                    category,
                    format_money(**amount, 2),
                    report.income_shares.get(*category).copied().unwrap_or(0.0) * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    vars.insert("expense_breakdown", breakdown);

    let largest = report
        .largest_expense()
        .map(|(category, amount)| format!("{} ({})", category, format_money(amount, 2)))
        .unwrap_or_default();
    vars.insert("largest_expense", largest);

    let key_expenses = expenses
        .iter()
        .take(KEY_EXPENSE_COUNT)
        .map(|(category, amount)| format!("{}: {}", category, format_money(**amount, 0)))
        .collect::<Vec<_>>()
        .join(", ");
    vars.insert("key_expenses", key_expenses);

    vars
}

/// Borrowed view of owned template variables, as the prompt renderer expects
pub(crate) fn borrow_vars<'a>(owned: &'a HashMap<&'static str, String>) -> HashMap<&'a str, &'a str> {
    owned.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

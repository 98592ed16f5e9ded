//! Domain models for Finsight

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category name that marks a record as income
pub const INCOME_CATEGORY: &str = "Income";

/// Category name for installment/loan payments (used by the debt-burden rule)
pub const EMI_CATEGORY: &str = "EMI";

/// Expense categories offered by the manual entry form, in display order
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Rent",
    "Food",
    "Transportation",
    "Shopping",
    "Entertainment",
    "EMI",
    "Utilities",
    "Healthcare",
    "Others",
];

/// One validated category/amount pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub category: String,
    pub amount: f64,
}

impl Record {
    pub fn new(category: impl Into<String>, amount: f64) -> Self {
        Self {
            category: category.into(),
            amount,
        }
    }

    /// Whether this record counts toward income (case-insensitive match)
    pub fn is_income(&self) -> bool {
        self.category.eq_ignore_ascii_case(INCOME_CATEGORY)
    }
}

/// Income/expense/savings summary derived from a set of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_income: f64,
    pub total_expense: f64,
    /// Always `total_income - total_expense`
    pub total_savings: f64,
    /// Fraction of income saved; 0 when there is no income
    pub savings_rate: f64,
    /// Sum per expense category
    pub category_totals: BTreeMap<String, f64>,
    /// Category sum / total expense (0 when there is no expense)
    pub category_shares: BTreeMap<String, f64>,
    /// Category sum / total income (0 when there is no income)
    pub income_shares: BTreeMap<String, f64>,
}

impl AggregateReport {
    /// Savings rate as a percentage (e.g. 46.0 for 0.46)
    pub fn savings_rate_percent(&self) -> f64 {
        self.savings_rate * 100.0
    }

    /// Total spent in a category, 0 if absent
    pub fn category_total(&self, category: &str) -> f64 {
        self.category_totals.get(category).copied().unwrap_or(0.0)
    }

    /// Expense category with the largest positive total
    pub fn largest_expense(&self) -> Option<(&str, f64)> {
        self.category_totals
            .iter()
            .filter(|(_, amount)| **amount > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, amount)| (name.as_str(), *amount))
    }

    /// Whether the report was built from no income and no expense at all
    pub fn is_empty(&self) -> bool {
        self.total_income == 0.0 && self.category_totals.values().all(|v| *v == 0.0)
    }
}

/// Qualitative health band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

impl std::str::FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poor" => Ok(Self::Poor),
            "fair" => Ok(Self::Fair),
            "good" => Ok(Self::Good),
            "excellent" => Ok(Self::Excellent),
            _ => Err(format!("Unknown band: {}", s)),
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Points awarded by each scoring rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub savings_rate: u8,
    pub positive_savings: u8,
    pub debt_burden: u8,
    pub expense_diversity: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        self.savings_rate + self.positive_savings + self.debt_burden + self.expense_diversity
    }
}

/// Derived 0-100 rating with qualitative band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// Always within 0..=100
    pub value: u8,
    pub band: Band,
    pub breakdown: ScoreBreakdown,
    /// Display label ("Excellent", "Needs Improvement", ...)
    pub status: String,
    /// Display color for the dashboard gauge
    pub color: String,
}

/// How the input reached us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// Manual entry form
    Manual,
    /// Uploaded CSV file
    Csv,
    /// Raw record list from the API
    Records,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Csv => "csv",
            Self::Records => "records",
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A report together with where and when it came from
///
/// This is what a browser session keeps and what the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    #[serde(flatten)]
    pub report: AggregateReport,
    /// Human label such as "October 2026"
    pub month: String,
    pub timestamp: DateTime<Utc>,
    pub source: InputSource,
}

impl FinancialSnapshot {
    /// Wrap a report, labelling it with the given month or the current one
    pub fn new(report: AggregateReport, source: InputSource, month: Option<String>) -> Self {
        let timestamp = Utc::now();
        let month = month
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| timestamp.format("%B %Y").to_string());
        Self {
            report,
            month,
            timestamp,
            source,
        }
    }
}

/// Speaker in a chat conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which component produced a narrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    /// Generated by the hosted model
    Ai,
    /// Deterministic rule-based fallback
    Rules,
}

//! Input normalization: raw rows, manual entry forms and CSV uploads
//!
//! Every entry point produces a validated `Vec<Record>`. A single bad row
//! rejects the whole input with `Error::Validation` naming the row; nothing
//! is silently skipped.

use std::collections::BTreeMap;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Record, EXPENSE_CATEGORIES, INCOME_CATEGORY};

/// Largest amount accepted for a single row
///
/// Keeps every total finite no matter how many rows an upload carries.
pub const MAX_AMOUNT: f64 = 1e15;

/// An amount as submitted: JSON number or text from a form field
///
/// Any other JSON value lands in `Other` so that it is reported as a
/// row-level validation error instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        AmountInput::Number(value)
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

/// One unvalidated category/amount pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
}

impl RawRow {
    pub fn new(category: &str, amount: impl Into<AmountInput>) -> Self {
        Self {
            category: Some(category.to_string()),
            amount: Some(amount.into()),
        }
    }
}

/// Manual entry form: income plus one optional field per expense category
///
/// Field keys are the lowercase category names (`rent`, `food`, `emi`, ...).
/// Unknown keys are ignored whatever their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualEntry {
    #[serde(default)]
    pub income: Option<AmountInput>,
    /// Optional label such as "March 2025"
    #[serde(default)]
    pub month: Option<String>,
    #[serde(flatten)]
    pub expenses: BTreeMap<String, Option<AmountInput>>,
}

/// Validate raw rows into records, rejecting the input on the first bad row
pub fn normalize_rows(rows: &[RawRow]) -> Result<Vec<Record>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| normalize_row(i + 1, row))
        .collect()
}

fn normalize_row(row_number: usize, row: &RawRow) -> Result<Record> {
    let category = row
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::invalid_row(row_number, "missing category"))?;

    let amount = match &row.amount {
        None => return Err(Error::invalid_row(row_number, "missing amount")),
        Some(AmountInput::Number(n)) => *n,
        Some(AmountInput::Text(s)) if s.trim().is_empty() => {
            return Err(Error::invalid_row(row_number, "missing amount"))
        }
        Some(AmountInput::Text(s)) => parse_amount(s)
            .ok_or_else(|| Error::invalid_row(row_number, format!("amount {:?} is not a number", s)))?,
        Some(AmountInput::Other(value)) => {
            return Err(Error::invalid_row(
                row_number,
                format!("amount {} is not a number", value),
            ))
        }
    };

    if !amount.is_finite() {
        return Err(Error::invalid_row(row_number, "amount must be a finite number"));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::invalid_row(row_number, "amount is too large"));
    }

    Ok(Record::new(canonical_category(category), amount))
}

/// Turn a manual entry form into records (one Income record plus one per
/// expense category). Blank or absent fields count as zero.
pub fn records_from_manual(entry: &ManualEntry) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(EXPENSE_CATEGORIES.len() + 1);
    records.push(Record::new(
        INCOME_CATEGORY,
        manual_field(INCOME_CATEGORY, entry.income.as_ref())?,
    ));

    for category in EXPENSE_CATEGORIES {
        let key = category.to_lowercase();
        let value = entry.expenses.get(&key).and_then(|v| v.as_ref());
        records.push(Record::new(*category, manual_field(category, value)?));
    }

    Ok(records)
}

fn manual_field(label: &str, value: Option<&AmountInput>) -> Result<f64> {
    let amount = match value {
        None => 0.0,
        Some(AmountInput::Number(n)) => *n,
        Some(AmountInput::Text(s)) if s.trim().is_empty() => 0.0,
        Some(AmountInput::Text(s)) => parse_amount(s).ok_or_else(|| {
            Error::Validation(format!("{}: {:?} is not a number", label, s))
        })?,
        Some(AmountInput::Other(value)) => {
            return Err(Error::Validation(format!(
                "{}: {} is not a number",
                label, value
            )))
        }
    };
    if !amount.is_finite() {
        return Err(Error::Validation(format!(
            "{}: amount must be a finite number",
            label
        )));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::Validation(format!("{}: amount is too large", label)));
    }
    Ok(amount)
}

/// Parse a `Category,Amount` CSV upload into records
///
/// Headers are matched case-insensitively in any column order; extra
/// columns are ignored and fully blank rows are skipped.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let category_col = find_column(&headers, "category")?;
    let amount_col = find_column(&headers, "amount")?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(RawRow {
            category: record.get(category_col).map(str::to_string),
            amount: record.get(amount_col).map(AmountInput::from),
        });
    }

    // Header occupies line 1, so data rows are reported from line 2
    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| normalize_row(i + 2, row))
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} CSV records", records.len());
    Ok(records)
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            Error::Validation(format!(
                "CSV must have a header row with Category and Amount columns (missing {})",
                name
            ))
        })
}

/// Canonical spelling for known categories; anything else is kept as entered
pub fn canonical_category(category: &str) -> String {
    let trimmed = category.trim();
    std::iter::once(INCOME_CATEGORY)
        .chain(EXPENSE_CATEGORIES.iter().copied())
        .find(|known| known.eq_ignore_ascii_case(trimmed))
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// Currency symbols accepted in front of an amount
const CURRENCY_SYMBOLS: &[char] = &['₹', '$', '€', '£'];

/// Parse a money amount
///
/// Accepts one leading currency symbol, a minus sign before or after it,
/// commas between digit groups (`50,000` and `1,00,000` alike) and an outer
/// pair of accounting-style parentheses for negatives. Anything else, such
/// as embedded spaces or stray symbols, is rejected.
pub fn parse_amount(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let (parenthesized, inner) = match trimmed.strip_prefix('(') {
        Some(rest) => (true, rest.strip_suffix(')')?.trim()),
        None => (false, trimmed),
    };

    let (mut negative, rest) = match inner.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let rest = match rest.strip_prefix(CURRENCY_SYMBOLS) {
        Some(after_symbol) => after_symbol.trim_start(),
        None => rest,
    };
    let rest = match rest.strip_prefix('-') {
        Some(_) if negative => return None,
        Some(after_sign) => {
            negative = true;
            after_sign
        }
        None => rest,
    };
    if parenthesized && negative {
        return None;
    }

    let value: f64 = plain_number(rest)?.parse().ok()?;
    let value = if negative || parenthesized { -value } else { value };
    Some(value).filter(|n| n.is_finite())
}

/// Digits with optional group commas and decimals, commas removed
fn plain_number(s: &str) -> Option<String> {
    let (whole, fraction) = match s.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (s, None),
    };

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !whole.split(',').all(all_digits) {
        return None;
    }
    if fraction.is_some_and(|f| !all_digits(f)) {
        return None;
    }

    let mut number = whole.replace(',', "");
    if let Some(fraction) = fraction {
        number.push('.');
        number.push_str(fraction);
    }
    Some(number)
}

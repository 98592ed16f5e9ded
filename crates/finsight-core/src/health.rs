//! Financial health scoring
//!
//! Turns an `AggregateReport` into a 0-100 score and a qualitative band.
//! The thresholds below are policy; they are not derived from anything.
//!
//! | Rule              | Max | Awarded for                                   |
//! |-------------------|-----|-----------------------------------------------|
//! | Savings rate      | 40  | >=30% 40, >=20% 30, >=10% 20, >=5% 10         |
//! | Positive savings  | 20  | savings > 0 20, >= -10% of income 10          |
//! | Debt burden (EMI) | 20  | 0% 20, <=30% 15, <=40% 10, <=50% 5 of income  |
//! | Expense diversity | 20  | largest category <=30% 20, <=40% 15, <=50% 10, <=60% 5 of expenses |
//!
//! The band comes from the savings rate alone.

use crate::models::{AggregateReport, Band, HealthScore, ScoreBreakdown, EMI_CATEGORY};

/// Savings rate thresholds for the band, highest first
const BAND_THRESHOLDS: &[(f64, Band)] = &[
    (0.30, Band::Excellent),
    (0.15, Band::Good),
    (0.0, Band::Fair),
];

const SAVINGS_RATE_POINTS: &[(f64, u8)] = &[(0.30, 40), (0.20, 30), (0.10, 20), (0.05, 10)];

/// Upper bounds (inclusive) on EMI share of income
const DEBT_BURDEN_POINTS: &[(f64, u8)] = &[(0.30, 15), (0.40, 10), (0.50, 5)];

/// Upper bounds (inclusive) on the largest category's share of expenses
const DIVERSITY_POINTS: &[(f64, u8)] = &[(0.30, 20), (0.40, 15), (0.50, 10), (0.60, 5)];

/// Score a report
///
/// Empty input (no income, no expense) scores 0 in the fair band.
pub fn score(report: &AggregateReport) -> HealthScore {
    let band = band_for(report.savings_rate);

    let breakdown = if report.is_empty() {
        ScoreBreakdown::default()
    } else {
        ScoreBreakdown {
            savings_rate: savings_rate_points(report.savings_rate),
            positive_savings: positive_savings_points(report),
            debt_burden: debt_burden_points(report),
            expense_diversity: diversity_points(report),
        }
    };

    let value = breakdown.total().min(100);
    let (status, color) = display_for(value);

    HealthScore {
        value,
        band,
        breakdown,
        status: status.to_string(),
        color: color.to_string(),
    }
}

/// Band for a savings rate (fraction)
pub fn band_for(savings_rate: f64) -> Band {
    BAND_THRESHOLDS
        .iter()
        .find(|(threshold, _)| savings_rate >= *threshold)
        .map(|(_, band)| *band)
        .unwrap_or(Band::Poor)
}

fn savings_rate_points(rate: f64) -> u8 {
    SAVINGS_RATE_POINTS
        .iter()
        .find(|(threshold, _)| rate >= *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

fn positive_savings_points(report: &AggregateReport) -> u8 {
    if report.total_savings > 0.0 {
        20
    } else if report.total_income > 0.0 && report.total_savings >= -0.1 * report.total_income {
        10
    } else {
        0
    }
}

fn debt_burden_points(report: &AggregateReport) -> u8 {
    if report.total_income <= 0.0 {
        return 0;
    }
    let emi_share = report.category_total(EMI_CATEGORY) / report.total_income;
    if emi_share <= 0.0 {
        return 20;
    }
    points_at_most(emi_share, DEBT_BURDEN_POINTS)
}

fn diversity_points(report: &AggregateReport) -> u8 {
    if report.total_expense <= 0.0 {
        return 0;
    }
    match report.largest_expense() {
        Some((_, largest)) => points_at_most(largest / report.total_expense, DIVERSITY_POINTS),
        None => 0,
    }
}

fn points_at_most(share: f64, table: &[(f64, u8)]) -> u8 {
    table
        .iter()
        .find(|(bound, _)| share <= *bound)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

/// Dashboard label and color for a score
fn display_for(value: u8) -> (&'static str, &'static str) {
    match value {
        80..=u8::MAX => ("Excellent", "green"),
        60..=79 => ("Good", "lightgreen"),
        40..=59 => ("Fair", "orange"),
        _ => ("Needs Improvement", "red"),
    }
}

//! Rule-based advisor
//!
//! Produces the markdown report shown when the narrative service is not
//! configured or fails. Output depends only on the report and score.

use std::fmt::Write;

use crate::models::{AggregateReport, HealthScore, EMI_CATEGORY};

/// Currency symbol used in every rendered amount
pub const CURRENCY_SYMBOL: &str = "₹";

/// Chat reply when no narrative backend is configured
pub const CHAT_UNCONFIGURED_MESSAGE: &str = "AI chat is currently unavailable. \
     Please configure FINSIGHT_AI_API_KEY to enable this feature.";

/// Chat reply when the narrative backend failed
pub const CHAT_FAILED_MESSAGE: &str =
    "I'm having trouble responding right now. Please try again in a moment.";

/// Savings rate the recommendations aim for
const TARGET_SAVINGS_RATE: f64 = 0.20;
/// EMI share of income above which debt is flagged
const EMI_WARNING_SHARE: f64 = 0.40;
/// Single-category share of income above which spending is flagged
const CATEGORY_WARNING_SHARE: f64 = 0.30;

const MAX_RECOMMENDATIONS: usize = 3;

/// Build the fallback analysis for a report
pub fn rule_based_analysis(report: &AggregateReport, score: &HealthScore) -> String {
    let rate = report.savings_rate_percent();
    let mut out = String::from("## 📊 Financial Analysis Report\n\n");

    out.push_str("### Overall Financial Health\n\n");
    let assessment = if report.savings_rate >= TARGET_SAVINGS_RATE {
        format!("Excellent! You're saving {:.1}% of your income.", rate)
    } else if report.savings_rate >= 0.10 {
        format!(
            "Good job! You're saving {:.1}% of your income. Aim for 20%.",
            rate
        )
    } else if report.savings_rate > 0.0 {
        format!(
            "You're saving {:.1}% of your income. Try increasing this.",
            rate
        )
    } else {
        "⚠️ You're currently not saving. Consider reducing expenses.".to_string()
    };
    let _ = writeln!(out, "{}", assessment);
    let _ = writeln!(
        out,
        "Your financial health score is {}/100 ({}).\n",
        score.value, score.status
    );

    out.push_str("### Key Recommendations\n\n");
    let recommendations = recommendations(report);
    if recommendations.is_empty() {
        out.push_str("- Keep your current habits and review your budget every month.\n");
    }
    for (i, rec) in recommendations.iter().take(MAX_RECOMMENDATIONS).enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, rec);
    }

    out.push_str("\n### Positive Highlights\n\n");
    if report.total_savings > 0.0 {
        let _ = writeln!(
            out,
            "- You save {} every month. Great discipline!",
            format_money(report.total_savings, 0)
        );
    } else {
        out.push_str("- Tracking your finances is a great first step.\n");
    }

    out
}

fn recommendations(report: &AggregateReport) -> Vec<String> {
    let mut recs = Vec::new();
    if report.total_income <= 0.0 {
        return recs;
    }

    let emi_share = report.category_total(EMI_CATEGORY) / report.total_income;
    if emi_share > EMI_WARNING_SHARE {
        recs.push(format!(
            "Reduce EMI burden: EMI is {:.1}% of income.",
            emi_share * 100.0
        ));
    }

    if report.savings_rate < TARGET_SAVINGS_RATE {
        recs.push("Increase savings gradually to reach at least 20% of income.".to_string());
    }

    if let Some((category, amount)) = report.largest_expense() {
        let share = amount / report.total_income;
        if share > CATEGORY_WARNING_SHARE && category != EMI_CATEGORY {
            recs.push(format!(
                "Review your {} spending: it takes {:.1}% of income.",
                category,
                share * 100.0
            ));
        }
    }

    recs
}

/// Format an amount with the currency symbol and thousands separators
pub fn format_money(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{}{}{}.{}", sign, CURRENCY_SYMBOL, grouped, f),
        None => format!("{}{}{}", sign, CURRENCY_SYMBOL, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::score;
    use crate::metrics::aggregate;
    use crate::models::Record;

    fn analysis_for(records: &[Record]) -> String {
        let report = aggregate(records);
        let health = score(&report);
        rule_based_analysis(&report, &health)
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(50000.0, 2), "₹50,000.00");
        assert_eq!(format_money(1234567.891, 2), "₹1,234,567.89");
        assert_eq!(format_money(999.0, 0), "₹999");
        assert_eq!(format_money(-1500.0, 0), "-₹1,500");
        assert_eq!(format_money(0.0, 2), "₹0.00");
        assert_eq!(format_money(-0.001, 2), "₹0.00");
    }

    #[test]
    fn test_healthy_saver() {
        let text = analysis_for(&[
            Record::new("Income", 50000.0),
            Record::new("Rent", 15000.0),
            Record::new("Food", 8000.0),
            Record::new("Transportation", 4000.0),
        ]);
        assert!(text.contains("Excellent! You're saving 46.0% of your income."));
        assert!(text.contains("85/100 (Excellent)"));
        assert!(text.contains("Keep your current habits"));
        assert!(text.contains("You save ₹23,000 every month"));
    }

    #[test]
    fn test_heavy_emi_and_low_savings() {
        let text = analysis_for(&[
            Record::new("Income", 10000.0),
            Record::new("EMI", 5000.0),
            Record::new("Food", 4500.0),
        ]);
        assert!(text.contains("1. Reduce EMI burden: EMI is 50.0% of income."));
        assert!(text.contains("2. Increase savings gradually"));
        assert!(!text.contains("Review your EMI spending"));
    }

    #[test]
    fn test_large_category_flagged() {
        let text = analysis_for(&[
            Record::new("Income", 10000.0),
            Record::new("Rent", 4000.0),
            Record::new("Food", 500.0),
        ]);
        assert!(text.contains("Review your Rent spending: it takes 40.0% of income."));
    }

    #[test]
    fn test_not_saving() {
        let text = analysis_for(&[Record::new("Income", 1000.0), Record::new("Rent", 1200.0)]);
        assert!(text.contains("You're currently not saving"));
        assert!(text.contains("Tracking your finances is a great first step."));
    }

    #[test]
    fn test_empty_input_has_no_recommendations() {
        let text = analysis_for(&[]);
        assert!(text.contains("0/100 (Needs Improvement)"));
        assert!(!text.contains("1. "));
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let records = [Record::new("Income", 700.0), Record::new("Food", 300.0)];
        assert_eq!(analysis_for(&records), analysis_for(&records));
    }
}

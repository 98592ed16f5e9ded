//! Metrics aggregation: records in, `AggregateReport` out

use std::collections::BTreeMap;

use crate::models::{AggregateReport, Record};

/// Sum records into an income/expense/savings summary
///
/// Records whose category is "Income" (any case) are income; every other
/// category is an expense. Ratios are 0 whenever their denominator is not
/// positive, so empty input is well defined. The savings rate never exceeds 1.
pub fn aggregate(records: &[Record]) -> AggregateReport {
    let mut total_income = 0.0;
    let mut category_totals: BTreeMap<String, f64> = BTreeMap::new();

    for record in records {
        if record.is_income() {
            total_income += record.amount;
        } else {
            *category_totals.entry(record.category.clone()).or_insert(0.0) += record.amount;
        }
    }

    let total_expense: f64 = category_totals.values().sum();
    let total_savings = total_income - total_expense;
    // Net refunds (negative expense total) cannot push the rate above 1
    let savings_rate = ratio(total_savings, total_income).min(1.0);

    let category_shares = category_totals
        .iter()
        .map(|(category, amount)| (category.clone(), ratio(*amount, total_expense)))
        .collect();
    let income_shares = category_totals
        .iter()
        .map(|(category, amount)| (category.clone(), ratio(*amount, total_income)))
        .collect();

    AggregateReport {
        total_income,
        total_expense,
        total_savings,
        savings_rate,
        category_totals,
        category_shares,
        income_shares,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("Income", 50000.0),
            Record::new("Rent", 15000.0),
            Record::new("Food", 8000.0),
            Record::new("Transportation", 4000.0),
        ]
    }

    #[test]
    fn test_aggregate_example() {
        let report = aggregate(&sample());
        assert_eq!(report.total_income, 50000.0);
        assert_eq!(report.total_expense, 27000.0);
        assert_eq!(report.total_savings, 23000.0);
        assert!((report.savings_rate - 0.46).abs() < EPSILON);
        assert_eq!(report.category_totals.len(), 3);
        assert!((report.category_shares["Rent"] - 15000.0 / 27000.0).abs() < EPSILON);
        assert!((report.income_shares["Rent"] - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_aggregate_empty() {
        let report = aggregate(&[]);
        assert_eq!(report.total_income, 0.0);
        assert_eq!(report.total_expense, 0.0);
        assert_eq!(report.total_savings, 0.0);
        assert_eq!(report.savings_rate, 0.0);
        assert!(report.category_totals.is_empty());
        assert!(report.is_empty());
    }

    #[test]
    fn test_aggregate_no_income_has_zero_rate() {
        let report = aggregate(&[Record::new("Rent", 500.0)]);
        assert_eq!(report.savings_rate, 0.0);
        assert_eq!(report.total_savings, -500.0);
        assert_eq!(report.income_shares["Rent"], 0.0);
        assert_eq!(report.category_shares["Rent"], 1.0);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_aggregate_income_only_has_zero_shares() {
        let report = aggregate(&[Record::new("Income", 1000.0)]);
        assert_eq!(report.savings_rate, 1.0);
        assert_eq!(report.total_expense, 0.0);
        assert!(report.category_shares.is_empty());
    }

    #[test]
    fn test_aggregate_sums_repeated_categories() {
        let records = vec![
            Record::new("Income", 1000.0),
            Record::new("income", 500.0),
            Record::new("Food", 100.0),
            Record::new("Food", 50.0),
        ];
        let report = aggregate(&records);
        assert_eq!(report.total_income, 1500.0);
        assert_eq!(report.category_total("Food"), 150.0);
        assert_eq!(report.category_total("Rent"), 0.0);
    }

    #[test]
    fn test_savings_identity_and_rate_bound() {
        let cases: Vec<Vec<Record>> = vec![
            sample(),
            vec![Record::new("Income", 0.1), Record::new("Food", 0.2)],
            vec![Record::new("Income", 1e9), Record::new("Rent", -50.0)],
            vec![
                Record::new("Income", 3333.33),
                Record::new("A", 1111.11),
                Record::new("B", 1111.11),
                Record::new("C", 1111.11),
            ],
        ];
        for records in cases {
            let report = aggregate(&records);
            assert!(
                (report.total_income - report.total_expense - report.total_savings).abs()
                    < EPSILON
            );
            if report.total_income > 0.0 {
                assert!(report.savings_rate <= 1.0 + EPSILON);
            }
        }
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let a = aggregate(&sample());
        let b = aggregate(&sample());
        assert_eq!(a, b);
    }

    #[test]
    fn test_largest_expense() {
        let report = aggregate(&sample());
        assert_eq!(report.largest_expense(), Some(("Rent", 15000.0)));
        assert_eq!(aggregate(&[]).largest_expense(), None);
    }
}

//! Offline report command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use finsight_core::advice::format_money;
use finsight_core::import::parse_csv;
use finsight_core::pipeline::{analyze, build_snapshot, AnalysisOutcome};
use finsight_core::{InputSource, NarrativeClient, NarrativeSource};

/// Analyze a CSV file and print the metrics, score and narrative
pub async fn cmd_report(file: &Path, month: Option<String>, no_ai: bool, json: bool) -> Result<()> {
    let narrator = if no_ai {
        None
    } else {
        NarrativeClient::from_env()
    };

    let (month, outcome) = run_report(file, month, narrator.as_ref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_report(&month, &outcome);
    Ok(())
}

/// Parse and analyze a CSV file, returning the snapshot month and outcome
pub async fn run_report(
    file: &Path,
    month: Option<String>,
    narrator: Option<&NarrativeClient>,
) -> Result<(String, AnalysisOutcome)> {
    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let records =
        parse_csv(reader).with_context(|| format!("Failed to read {}", file.display()))?;
    info!(records = records.len(), "Loaded {}", file.display());

    let snapshot = build_snapshot(&records, InputSource::Csv, month);
    let outcome = analyze(&snapshot, narrator).await;

    Ok((snapshot.month, outcome))
}

fn print_report(month: &str, outcome: &AnalysisOutcome) {
    let metrics = &outcome.metrics;

    println!("📊 Finsight report: {}", month);
    println!();
    println!("   Income:        {}", format_money(metrics.total_income, 2));
    println!("   Expenses:      {}", format_money(metrics.total_expense, 2));
    println!("   Savings:       {}", format_money(metrics.total_savings, 2));
    println!("   Savings rate:  {:.1}%", metrics.savings_rate_percent());
    println!(
        "   Health score:  {}/100 ({})",
        outcome.score.value, outcome.score.status
    );

    let mut categories: Vec<(&String, &f64)> = metrics.category_totals.iter().collect();
    categories.sort_by(|a, b| b.1.total_cmp(a.1));
    if !categories.is_empty() {
        println!();
        println!("   {:<18} {:>14} {:>8}", "CATEGORY", "AMOUNT", "SHARE");
        println!("   {}", "-".repeat(42));
        for (name, amount) in categories {
            let share = metrics.category_shares.get(name).copied().unwrap_or(0.0);
            println!(
                "   {:<18} {:>14} {:>7.1}%",
                name,
                format_money(*amount, 2),
                share * 100.0
            );
        }
    }

    println!();
    println!("{}", outcome.narrative);

    if outcome.narrative_source == NarrativeSource::Rules {
        println!();
        println!("   ℹ️  Rule-based advice (set FINSIGHT_AI_API_KEY for AI analysis)");
    }
}

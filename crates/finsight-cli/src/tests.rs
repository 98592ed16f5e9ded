//! CLI command tests

use std::io::Write;

use finsight_core::{NarrativeClient, NarrativeSource, PromptLibrary};
use tempfile::NamedTempFile;

use crate::commands;

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const SAMPLE_CSV: &str = "Category,Amount\nIncome,50000\nRent,15000\nFood,8000\nTransportation,4000\n";

// ========== Report Command Tests ==========

#[tokio::test]
async fn test_run_report_rule_based() {
    let file = csv_file(SAMPLE_CSV);

    let (month, outcome) = commands::run_report(file.path(), Some("June 2025".into()), None)
        .await
        .unwrap();

    assert_eq!(month, "June 2025");
    assert_eq!(outcome.metrics.total_savings, 23000.0);
    assert_eq!(outcome.score.value, 85);
    assert_eq!(outcome.narrative_source, NarrativeSource::Rules);
}

#[tokio::test]
async fn test_run_report_with_narrator() {
    let file = csv_file(SAMPLE_CSV);
    let narrator = NarrativeClient::mock();

    let (_, outcome) = commands::run_report(file.path(), None, Some(&narrator))
        .await
        .unwrap();

    assert_eq!(outcome.narrative_source, NarrativeSource::Ai);
    assert!(outcome.narrative.starts_with("## Mock analysis"));
}

#[tokio::test]
async fn test_cmd_report_prints() {
    let file = csv_file(SAMPLE_CSV);
    assert!(commands::cmd_report(file.path(), None, true, false)
        .await
        .is_ok());
    assert!(commands::cmd_report(file.path(), None, true, true)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cmd_report_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.csv");

    let err = commands::cmd_report(&missing, None, true, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to open"));
}

#[tokio::test]
async fn test_cmd_report_bad_row() {
    let file = csv_file("Category,Amount\nIncome,100\nFood,abc\n");

    let err = commands::cmd_report(file.path(), None, true, false)
        .await
        .unwrap_err();
    let root = err.root_cause().to_string();
    assert_eq!(root, "Row 3: amount \"abc\" is not a number");
}

// ========== Serve Command Tests ==========

#[test]
fn test_parse_origins() {
    assert!(commands::parse_origins("").is_empty());
    assert_eq!(
        commands::parse_origins("http://localhost:5173, ,https://finsight.example"),
        vec!["http://localhost:5173", "https://finsight.example"]
    );
}

// ========== Prompts Command Tests ==========

#[test]
fn test_cmd_prompts_list() {
    let library = PromptLibrary::embedded_only();
    assert!(commands::cmd_prompts_list(&library).is_ok());
    assert!(commands::cmd_prompts_path(&library).is_ok());
}

#[test]
fn test_cmd_prompts_show() {
    let mut library = PromptLibrary::embedded_only();
    assert!(commands::cmd_prompts_show(&mut library, "chat_advisor").is_ok());

    let err = commands::cmd_prompts_show(&mut library, "classify_merchant").unwrap_err();
    assert!(err.to_string().contains("analyze_finances"));
}

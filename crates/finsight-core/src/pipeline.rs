//! Analysis pipeline: snapshot → score → narrative
//!
//! Narrative failures never fail the pipeline. They are logged and replaced
//! by the rule-based advisor (or a fixed chat message).

use serde::Serialize;
use tracing::{info, warn};

use crate::advice::{rule_based_analysis, CHAT_FAILED_MESSAGE, CHAT_UNCONFIGURED_MESSAGE};
use crate::ai::{NarrativeBackend, NarrativeClient};
use crate::health::score;
use crate::metrics::aggregate;
use crate::models::{
    AggregateReport, ChatTurn, FinancialSnapshot, HealthScore, InputSource, NarrativeSource,
    Record,
};

/// Everything a report view needs
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub metrics: AggregateReport,
    pub score: HealthScore,
    pub narrative: String,
    pub narrative_source: NarrativeSource,
}

/// A chat reply and who wrote it
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub source: NarrativeSource,
}

/// Aggregate validated records into a labelled snapshot
pub fn build_snapshot(
    records: &[Record],
    source: InputSource,
    month: Option<String>,
) -> FinancialSnapshot {
    FinancialSnapshot::new(aggregate(records), source, month)
}

/// Score a snapshot and narrate it, falling back to the rule-based advisor
pub async fn analyze(
    snapshot: &FinancialSnapshot,
    narrator: Option<&NarrativeClient>,
) -> AnalysisOutcome {
    let health = score(&snapshot.report);

    let (narrative, narrative_source) = match narrator {
        Some(client) => match client.analyze(snapshot, &health).await {
            Ok(text) => (text, NarrativeSource::Ai),
            Err(e) => {
                warn!(error = %e, model = client.model(), "Narrative service failed, using rule-based analysis");
                (
                    rule_based_analysis(&snapshot.report, &health),
                    NarrativeSource::Rules,
                )
            }
        },
        None => (
            rule_based_analysis(&snapshot.report, &health),
            NarrativeSource::Rules,
        ),
    };

    info!(
        score = health.value,
        band = %health.band,
        source = ?narrative_source,
        "Analysis complete"
    );

    AnalysisOutcome {
        metrics: snapshot.report.clone(),
        score: health,
        narrative,
        narrative_source,
    }
}

/// Answer a chat question about a snapshot
///
/// Without a narrator, or when it fails, the reply is a fixed message.
pub async fn chat(
    snapshot: &FinancialSnapshot,
    history: &[ChatTurn],
    question: &str,
    narrator: Option<&NarrativeClient>,
) -> ChatReply {
    let Some(client) = narrator else {
        return ChatReply {
            response: CHAT_UNCONFIGURED_MESSAGE.to_string(),
            source: NarrativeSource::Rules,
        };
    };

    let health = score(&snapshot.report);
    match client.chat(snapshot, &health, history, question).await {
        Ok(response) => ChatReply {
            response,
            source: NarrativeSource::Ai,
        },
        Err(e) => {
            warn!(error = %e, model = client.model(), "Chat request failed");
            ChatReply {
                response: CHAT_FAILED_MESSAGE.to_string(),
                source: NarrativeSource::Rules,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::Band;

    fn snapshot() -> FinancialSnapshot {
        build_snapshot(
            &[
                Record::new("Income", 50000.0),
                Record::new("Rent", 15000.0),
                Record::new("Food", 8000.0),
                Record::new("Transportation", 4000.0),
            ],
            InputSource::Records,
            Some("August 2025".into()),
        )
    }

    #[tokio::test]
    async fn test_analyze_with_narrator() {
        let client = NarrativeClient::mock();
        let outcome = analyze(&snapshot(), Some(&client)).await;
        assert_eq!(outcome.narrative_source, NarrativeSource::Ai);
        assert!(outcome.narrative.starts_with("## Mock analysis for August 2025"));
        assert_eq!(outcome.score.band, Band::Excellent);
        assert_eq!(outcome.metrics.total_savings, 23000.0);
    }

    #[tokio::test]
    async fn test_analyze_without_narrator_uses_rules() {
        let outcome = analyze(&snapshot(), None).await;
        assert_eq!(outcome.narrative_source, NarrativeSource::Rules);
        assert!(outcome.narrative.contains("Financial Analysis Report"));
        assert_eq!(outcome.score.value, 85);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_service_error() {
        let client = NarrativeClient::Mock(MockBackend::failing());
        let outcome = analyze(&snapshot(), Some(&client)).await;
        assert_eq!(outcome.narrative_source, NarrativeSource::Rules);
        assert!(outcome.narrative.contains("Excellent! You're saving 46.0%"));
        assert_eq!(outcome.metrics.total_income, 50000.0);
    }

    #[tokio::test]
    async fn test_outcome_serializes_sources_lowercase() {
        let outcome = analyze(&snapshot(), None).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["narrative_source"], "rules");
        assert_eq!(json["score"]["band"], "excellent");
        assert_eq!(json["metrics"]["total_expense"], 27000.0);
    }

    #[tokio::test]
    async fn test_chat_fallbacks() {
        let reply = chat(&snapshot(), &[], "How do I save?", None).await;
        assert_eq!(reply.response, CHAT_UNCONFIGURED_MESSAGE);

        let failing = NarrativeClient::Mock(MockBackend::failing());
        let reply = chat(&snapshot(), &[], "How do I save?", Some(&failing)).await;
        assert_eq!(reply.response, CHAT_FAILED_MESSAGE);
        assert_eq!(reply.source, NarrativeSource::Rules);

        let client = NarrativeClient::mock();
        let reply = chat(&snapshot(), &[], "How do I save?", Some(&client)).await;
        assert_eq!(reply.source, NarrativeSource::Ai);
        assert!(reply.response.ends_with("How do I save?"));
    }
}

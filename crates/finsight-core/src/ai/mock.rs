//! Mock backend for testing
//!
//! Deterministic narratives built from the snapshot itself.
//! Useful for unit tests and development without an API key.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ChatTurn, FinancialSnapshot, HealthScore};

use super::NarrativeBackend;

/// Mock narrative backend for testing
///
/// Returns predictable responses, or `Error::Service` when built with
/// `failing()`.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Whether analyze/chat should fail like an unreachable service
    pub failing: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            failing: false,
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            failing: false,
        }
    }

    /// Create a mock whose every narrative call fails
    pub fn failing() -> Self {
        Self {
            healthy: false,
            failing: true,
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(Error::Service("mock backend configured to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl NarrativeBackend for MockBackend {
    async fn analyze(&self, snapshot: &FinancialSnapshot, score: &HealthScore) -> Result<String> {
        self.check()?;
        Ok(format!(
            "## Mock analysis for {}\n\nHealth score {}/100 ({}), savings rate {:.1}%.",
            snapshot.month,
            score.value,
            score.band,
            snapshot.report.savings_rate_percent()
        ))
    }

    async fn chat(
        &self,
        _snapshot: &FinancialSnapshot,
        score: &HealthScore,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String> {
        self.check()?;
        Ok(format!(
            "Mock advice (score {}, {} earlier turns): {}",
            score.value,
            history.len(),
            question
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::score;
    use crate::metrics::aggregate;
    use crate::models::{InputSource, Record};

    fn sample() -> (FinancialSnapshot, HealthScore) {
        let report = aggregate(&[Record::new("Income", 1000.0), Record::new("Food", 250.0)]);
        let health = score(&report);
        (
            FinancialSnapshot::new(report, InputSource::Manual, Some("July 2025".into())),
            health,
        )
    }

    #[tokio::test]
    async fn test_mock_analyze() {
        let (snapshot, health) = sample();
        let text = MockBackend::new().analyze(&snapshot, &health).await.unwrap();
        assert!(text.contains("July 2025"));
        assert!(text.contains("savings rate 75.0%"));
    }

    #[tokio::test]
    async fn test_mock_chat_echoes_question() {
        let (snapshot, health) = sample();
        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let text = MockBackend::new()
            .chat(&snapshot, &health, &history, "Should I invest?")
            .await
            .unwrap();
        assert!(text.contains("2 earlier turns"));
        assert!(text.ends_with("Should I invest?"));
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let (snapshot, health) = sample();
        let mock = MockBackend::failing();
        assert!(mock.analyze(&snapshot, &health).await.unwrap_err().is_service());
        assert!(mock.chat(&snapshot, &health, &[], "q").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let healthy = MockBackend::new();
        assert!(healthy.health_check().await);

        let unhealthy = MockBackend::unhealthy();
        assert!(!unhealthy.health_check().await);
    }
}

//! OpenAI-compatible backend implementation
//!
//! Works with any hosted service that implements the OpenAI chat completions
//! API. The default host is Groq:
//! - Groq (https://api.groq.com/openai)
//! - OpenAI (https://api.openai.com)
//! - Self-hosted vLLM, LocalAI, llama-server
//!
//! # Configuration
//!
//! Environment variables:
//! - `FINSIGHT_AI_API_KEY`: API key (required)
//! - `FINSIGHT_AI_HOST`: Server URL (default: https://api.groq.com/openai)
//! - `FINSIGHT_AI_MODEL`: Model name (default: llama-3.1-8b-instant)

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{ChatTurn, FinancialSnapshot, HealthScore};
use crate::prompts::{PromptId, PromptLibrary};

use super::{borrow_vars, summary_vars, NarrativeBackend, MAX_CHAT_HISTORY};

/// Default hosted endpoint
pub const DEFAULT_HOST: &str = "https://api.groq.com/openai";
/// Default model
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
/// Fixed timeout for every outbound request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sampling settings for the one-shot report
const ANALYSIS_TEMPERATURE: f32 = 0.7;
const ANALYSIS_MAX_TOKENS: u32 = 1500;
/// Sampling settings for chat replies
const CHAT_TEMPERATURE: f32 = 0.8;
const CHAT_MAX_TOKENS: u32 = 800;

/// Longest error body kept in a service error message
const MAX_ERROR_BODY: usize = 200;

/// OpenAI-compatible backend
///
/// Posts to `{host}/v1/chat/completions` with a bearer API key.
///
/// # Example
///
/// ```rust,ignore
/// // Groq (default host)
/// export FINSIGHT_AI_API_KEY="gsk_..."
///
/// // OpenAI
/// export FINSIGHT_AI_HOST="https://api.openai.com"
/// export FINSIGHT_AI_MODEL="gpt-4o-mini"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OpenAICompatibleBackend {
    /// Create a new backend without an API key
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: build_client(REQUEST_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout: REQUEST_TIMEOUT,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Use a specific prompt library (e.g. embedded only in tests)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = build_client(timeout);
        self.timeout = timeout;
        self
    }

    /// Create from environment variables
    ///
    /// Required: `FINSIGHT_AI_API_KEY`
    /// Optional: `FINSIGHT_AI_HOST` (default: https://api.groq.com/openai)
    /// Optional: `FINSIGHT_AI_MODEL` (default: llama-3.1-8b-instant)
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("FINSIGHT_AI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let host = std::env::var("FINSIGHT_AI_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let model =
            std::env::var("FINSIGHT_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Some(Self::with_api_key(&host, &model, &api_key))
    }

    /// Render a prompt's system and user sections
    fn render(&self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<(String, String)> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(id)?;
        Ok((template.render_system(vars), template.render_user(vars)))
    }

    /// Make a chat completion request
    async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<String> {
        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| service_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(status = %status, model = %self.model, "Completion request rejected");
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                Error::Service(format!("rate limited (429): {}", body))
            } else {
                Error::Service(format!("API error {}: {}", status, body))
            });
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| service_error(e, self.timeout))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::Service("empty response from completion API".into()))
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
            Client::new()
        })
}

fn service_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Service(format!("request timed out after {:?}", timeout))
    } else if e.is_decode() {
        Error::Service(format!("malformed response: {}", e))
    } else {
        Error::Service(format!("request failed: {}", e))
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl NarrativeBackend for OpenAICompatibleBackend {
    async fn analyze(&self, snapshot: &FinancialSnapshot, score: &HealthScore) -> Result<String> {
        let owned = summary_vars(snapshot, score);
        let (system, user) = self.render(PromptId::AnalyzeFinances, &borrow_vars(&owned))?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::new("system", system), ChatMessage::new("user", user)],
            temperature: Some(ANALYSIS_TEMPERATURE),
            max_tokens: Some(ANALYSIS_MAX_TOKENS),
            stream: false,
        };

        let response = self.chat_completion(&request).await?;
        debug!(model = %self.model, chars = response.len(), "Analysis narrative received");
        Ok(response)
    }

    async fn chat(
        &self,
        snapshot: &FinancialSnapshot,
        score: &HealthScore,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String> {
        let mut owned = summary_vars(snapshot, score);
        owned.insert("question", question.to_string());
        let (system, user) = self.render(PromptId::ChatAdvisor, &borrow_vars(&owned))?;

        let recent = &history[history.len().saturating_sub(MAX_CHAT_HISTORY)..];
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(ChatMessage::new("system", system));
        messages.extend(
            recent
                .iter()
                .map(|turn| ChatMessage::new(turn.role.as_str(), turn.content.clone())),
        );
        messages.push(ChatMessage::new("user", user));

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(CHAT_TEMPERATURE),
            max_tokens: Some(CHAT_MAX_TOKENS),
            stream: false,
        };

        let response = self.chat_completion(&request).await?;
        debug!(model = %self.model, turns = recent.len(), "Chat reply received");
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self
            .http_client
            .get(format!("{}/v1/models", self.base_url));
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        match req_builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, host = %self.base_url, "Narrative backend health check failed");
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::score;
    use crate::metrics::aggregate;
    use crate::models::{InputSource, Record};
    use crate::test_utils::MockCompletionServer;

    fn sample() -> (FinancialSnapshot, HealthScore) {
        let report = aggregate(&[
            Record::new("Income", 50000.0),
            Record::new("Rent", 15000.0),
            Record::new("Food", 8000.0),
        ]);
        let health = score(&report);
        (
            FinancialSnapshot::new(report, InputSource::Csv, Some("June 2025".into())),
            health,
        )
    }

    fn backend_for(server: &MockCompletionServer) -> OpenAICompatibleBackend {
        OpenAICompatibleBackend::with_api_key(&server.url(), "test-model", "sk-test")
            .with_prompts(PromptLibrary::embedded_only())
    }

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OpenAICompatibleBackend::new("https://api.groq.com/openai/", DEFAULT_MODEL);
        assert_eq!(backend.host(), "https://api.groq.com/openai");
        assert_eq!(backend.model(), "llama-3.1-8b-instant");
        assert!(backend.api_key.is_none());
    }

    #[test]
    fn test_backend_with_api_key() {
        let backend = OpenAICompatibleBackend::with_api_key(DEFAULT_HOST, "m", "gsk_test");
        assert_eq!(backend.api_key, Some("gsk_test".to_string()));
    }

    #[test]
    fn test_chat_completion_request_serialization() {
        let request = ChatCompletionRequest {
            model: "llama-3.1-8b-instant".to_string(),
            messages: vec![
                ChatMessage::new("system", "Be brief."),
                ChatMessage::new("user", "Hello"),
            ],
            temperature: Some(0.7),
            max_tokens: None,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.7).abs() < 0.001);
        assert_eq!(json["stream"], false);
        // max_tokens should be omitted when None
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_chat_completion_response_deserialization() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "llama-3.1-8b-instant",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Save more."},
                "finish_reason": "stop"
            }]
        }"#;

        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Save more."));
    }

    #[tokio::test]
    async fn test_analyze_sends_prompt_and_settings() {
        let server = MockCompletionServer::start().await;
        let backend = backend_for(&server);
        let (snapshot, health) = sample();

        let text = backend.analyze(&snapshot, &health).await.unwrap();
        assert_eq!(text, server.reply());

        let request = server.last_request().unwrap();
        assert_eq!(request["model"], "test-model");
        assert_eq!(request["max_tokens"], 1500);
        assert_eq!(request["messages"][0]["role"], "system");
        let user = request["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Financial Summary (June 2025)"));
        assert!(user.contains("- Rent: ₹15,000.00 (30.0% of income)"));
        assert!(user.contains("The largest expense category is Rent"));
        assert_eq!(server.last_auth().as_deref(), Some("Bearer sk-test"));
    }

    #[tokio::test]
    async fn test_chat_keeps_recent_history() {
        let server = MockCompletionServer::start().await;
        let backend = backend_for(&server);
        let (snapshot, health) = sample();

        let history: Vec<ChatTurn> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("question {}", i))
                } else {
                    ChatTurn::assistant(format!("answer {}", i))
                }
            })
            .collect();

        backend
            .chat(&snapshot, &health, &history, "Can I afford a car?")
            .await
            .unwrap();

        let request = server.last_request().unwrap();
        let messages = request["messages"].as_array().unwrap();
        // system + 12 history turns + question
        assert_eq!(messages.len(), MAX_CHAT_HISTORY + 2);
        assert_eq!(messages[1]["content"], "question 8");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[13]["content"], "Can I afford a car?");
        assert_eq!(request["max_tokens"], 800);
        assert!(messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("Key Expenses: Rent: ₹15,000, Food: ₹8,000"));
    }

    #[tokio::test]
    async fn test_chat_question_sent_verbatim() {
        let server = MockCompletionServer::start().await;
        let backend = backend_for(&server);
        let (snapshot, health) = sample();
        let question = "Is {{income}} a lot? {{#if savings}}tell me{{/if}}";

        backend.chat(&snapshot, &health, &[], question).await.unwrap();

        let request = server.last_request().unwrap();
        let messages = request["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["content"], question);
    }

    #[tokio::test]
    async fn test_rate_limit_is_service_error() {
        let server = MockCompletionServer::with_status(429).await;
        let backend = backend_for(&server);
        let (snapshot, health) = sample();

        let err = backend.analyze(&snapshot, &health).await.unwrap_err();
        assert!(err.is_service());
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_service_error() {
        let server = MockCompletionServer::with_reply("").await;
        let backend = backend_for(&server);
        let (snapshot, health) = sample();

        let err = backend.analyze(&snapshot, &health).await.unwrap_err();
        assert!(err.is_service());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_service_error() {
        let backend = OpenAICompatibleBackend::with_api_key("http://127.0.0.1:1", "m", "k")
            .with_prompts(PromptLibrary::embedded_only());
        let (snapshot, health) = sample();

        let err = backend.analyze(&snapshot, &health).await.unwrap_err();
        assert!(err.is_service());
        assert!(!backend.health_check().await);
    }

    #[tokio::test]
    async fn test_timeout_is_service_error() {
        let server = MockCompletionServer::with_delay(Duration::from_secs(2)).await;
        let backend = backend_for(&server).with_timeout(Duration::from_millis(200));
        let (snapshot, health) = sample();

        let err = backend.analyze(&snapshot, &health).await.unwrap_err();
        assert!(err.is_service());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_health_check_ok() {
        let server = MockCompletionServer::start().await;
        assert!(backend_for(&server).health_check().await);
    }
}

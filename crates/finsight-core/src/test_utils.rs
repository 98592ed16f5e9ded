//! Test utilities for finsight-core
//!
//! This module provides a mock OpenAI-compatible completion server that can
//! be used for development and integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Default narrative returned by the mock server
pub const MOCK_REPLY: &str = "## Mock AI Analysis\n\nYour finances look steady.";

struct MockState {
    status: StatusCode,
    reply: String,
    delay: Option<Duration>,
    last_request: Mutex<Option<Value>>,
    last_auth: Mutex<Option<String>>,
}

/// Mock OpenAI-compatible server for testing and development
pub struct MockCompletionServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockCompletionServer {
    /// Start a server that answers every completion with `MOCK_REPLY`
    pub async fn start() -> Self {
        Self::launch(StatusCode::OK, MOCK_REPLY, None).await
    }

    /// Start a server that answers every completion with the given text
    pub async fn with_reply(reply: &str) -> Self {
        Self::launch(StatusCode::OK, reply, None).await
    }

    /// Start a server that rejects every completion with the given status
    pub async fn with_status(status: u16) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        Self::launch(status, MOCK_REPLY, None).await
    }

    /// Start a server that stalls before answering (for timeout tests)
    pub async fn with_delay(delay: Duration) -> Self {
        Self::launch(StatusCode::OK, MOCK_REPLY, Some(delay)).await
    }

    async fn launch(status: StatusCode, reply: &str, delay: Option<Duration>) -> Self {
        let state = Arc::new(MockState {
            status,
            reply: reply.to_string(),
            delay,
            last_request: Mutex::new(None),
            last_auth: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_completion))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The text this server answers with
    pub fn reply(&self) -> &str {
        &self.state.reply
    }

    /// JSON body of the most recent completion request
    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().unwrap().clone()
    }

    /// Authorization header of the most recent completion request
    pub fn last_auth(&self) -> Option<String> {
        self.state.last_auth.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockCompletionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Model list endpoint (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "llama-3.1-8b-instant", "object": "model"}]
    }))
}

/// Chat completions endpoint
async fn handle_completion(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    *state.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let model = request["model"].clone();
    *state.last_request.lock().unwrap() = Some(request);

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    if !state.status.is_success() {
        return (
            state.status,
            Json(json!({"error": {"message": "mock failure", "type": "mock_error"}})),
        )
            .into_response();
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.reply},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockCompletionServer::start().await;
        let url = server.url();
        assert!(url.starts_with("http://127.0.0.1:"));
        assert_eq!(server.reply(), MOCK_REPLY);
        assert!(server.last_request().is_none());
    }

    #[tokio::test]
    async fn test_mock_server_records_requests() {
        let server = MockCompletionServer::with_reply("hi").await;
        let client = reqwest::Client::new();
        let response: Value = client
            .post(format!("{}/v1/chat/completions", server.url()))
            .header("Authorization", "Bearer k")
            .json(&json!({"model": "m", "messages": []}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["choices"][0]["message"]["content"], "hi");
        assert_eq!(server.last_request().unwrap()["model"], "m");
        assert_eq!(server.last_auth().as_deref(), Some("Bearer k"));
    }
}

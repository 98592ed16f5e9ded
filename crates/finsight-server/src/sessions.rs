//! Browser sessions: signed cookie plus in-memory per-session state
//!
//! A session holds the latest financial snapshot and the chat history.
//! The cookie value is `<id>.<signature>` where the signature is the hex
//! SHA-256 of the server secret and the id. Nothing is persisted; a restart
//! drops every session.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use finsight_core::{ChatTurn, FinancialSnapshot};

/// Cookie carrying the signed session id
pub const SESSION_COOKIE: &str = "finsight_session";

/// Session timeout (30 minutes of inactivity)
const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Maximum chat turns kept per session
const MAX_HISTORY_TURNS: usize = 40;

/// Session signing configuration
#[derive(Clone)]
pub struct SessionConfig {
    secret: Vec<u8>,
}

impl SessionConfig {
    /// Use a fixed signing secret
    pub fn with_secret(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Read `FINSIGHT_SESSION_SECRET`, or generate a per-process secret
    ///
    /// A generated secret invalidates every cookie on restart.
    pub fn from_env() -> Self {
        match std::env::var("FINSIGHT_SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => Self::with_secret(secret.trim()),
            _ => {
                warn!("⚠️  FINSIGHT_SESSION_SECRET not set, sessions will not survive a restart");
                Self::random()
            }
        }
    }

    /// Generate a random secret
    pub fn random() -> Self {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self::with_secret(&secret)
    }

    fn sign(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(b".");
        hasher.update(id.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Cookie value for a session id
    pub fn cookie_value(&self, id: &str) -> String {
        format!("{}.{}", id, self.sign(id))
    }

    /// Session id from a cookie value, if the signature checks out
    pub fn verify(&self, value: &str) -> Option<String> {
        let (id, signature) = value.split_once('.')?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let expected = self.sign(id);
        let provided = signature.as_bytes();
        // Only compare if lengths match (constant-time for same-length values)
        if provided.len() == expected.len() && bool::from(provided.ct_eq(expected.as_bytes())) {
            Some(id.to_string())
        } else {
            None
        }
    }
}

/// State kept for one browser
#[derive(Debug, Clone)]
struct Session {
    last_activity: Instant,
    snapshot: Option<FinancialSnapshot>,
    history: Vec<ChatTurn>,
}

impl Session {
    fn new() -> Self {
        Self {
            last_activity: Instant::now(),
            snapshot: None,
            history: Vec::new(),
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// In-memory session store
pub struct SessionStore {
    config: SessionConfig,
    timeout: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_timeout(config, SESSION_TIMEOUT)
    }

    /// Store whose sessions expire after `timeout` of inactivity
    pub fn with_timeout(config: SessionConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Drop expired sessions; called by every write that may add one
    fn purge_expired(&self, sessions: &mut HashMap<String, Session>) {
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.timeout));
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "Expired sessions removed");
        }
    }

    /// Verified session id from the request cookies
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == SESSION_COOKIE)
            .find_map(|(_, value)| self.config.verify(value))
    }

    /// Existing session id from the request, or a fresh one
    pub fn resolve(&self, headers: &HeaderMap) -> String {
        self.session_id(headers).unwrap_or_else(|| {
            let id = Uuid::new_v4().simple().to_string();
            debug!(session = %id, "Starting new session");
            id
        })
    }

    /// `Set-Cookie` header value for a session id
    pub fn cookie_header(&self, id: &str) -> Option<HeaderValue> {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.config.cookie_value(id)
        );
        HeaderValue::from_str(&cookie).ok()
    }

    /// Replace the session's snapshot and start a new conversation
    pub async fn store_snapshot(&self, id: &str, snapshot: FinancialSnapshot) {
        let mut sessions = self.sessions.write().await;

        self.purge_expired(&mut sessions);

        let session = sessions.entry(id.to_string()).or_insert_with(Session::new);
        session.snapshot = Some(snapshot);
        session.history.clear();
        session.touch();
    }

    /// The session's snapshot (None if not found, expired, or never submitted)
    pub async fn snapshot(&self, id: &str) -> Option<FinancialSnapshot> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).filter(|s| !s.is_expired(self.timeout))?;
        session.touch();
        session.snapshot.clone()
    }

    /// The session's chat history, oldest first
    pub async fn history(&self, id: &str) -> Vec<ChatTurn> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| !s.is_expired(self.timeout))
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Append a question and its answer to the session's history
    pub async fn record_exchange(&self, id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;
        self.purge_expired(&mut sessions);

        let session = sessions.entry(id.to_string()).or_insert_with(Session::new);
        session.history.push(ChatTurn::user(question));
        session.history.push(ChatTurn::assistant(answer));
        // Trim if too long (keep most recent)
        if session.history.len() > MAX_HISTORY_TURNS {
            let start = session.history.len() - MAX_HISTORY_TURNS;
            session.history.drain(..start);
        }
        session.touch();
    }

    /// Number of live sessions
    pub async fn active_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| !s.is_expired(self.timeout))
            .count()
    }
}

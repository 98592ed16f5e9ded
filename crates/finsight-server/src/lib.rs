//! Finsight Web Server
//!
//! Axum-based JSON API for the Finsight financial advisor.
//!
//! Security features:
//! - Signed session cookies (constant-time signature check)
//! - Restrictive CORS policy
//! - Input validation (upload size and type, message length)
//! - Security headers on every response
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Request},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use finsight_core::{NarrativeBackend, NarrativeClient};

mod handlers;
pub mod sessions;

pub use sessions::{SessionConfig, SessionStore, SESSION_COOKIE};

/// Maximum file upload size (16 MB)
pub const MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    /// Narrative client, None when no API key is configured
    pub narrator: Option<NarrativeClient>,
    /// Per-browser snapshots and chat history
    pub sessions: SessionStore,
}

/// Create the application router
pub fn create_router(
    static_dir: Option<&str>,
    config: ServerConfig,
    narrator: Option<NarrativeClient>,
    session_config: SessionConfig,
) -> Router {
    let state = Arc::new(AppState {
        narrator,
        sessions: SessionStore::new(session_config),
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/report", post(handlers::create_report))
        .route("/process-manual", post(handlers::process_manual))
        .route("/process-csv", post(handlers::process_csv))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/analyze", post(handlers::analyze_session))
        .route("/chat", post(handlers::chat_message))
        // Room for multipart framing around a maximum-size file
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        // Allow specified origins (with the session cookie)
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    // Security headers
    // CSP: restrict scripts to same-origin, allow inline styles and chart images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let narrator = NarrativeClient::from_env();
    check_ai_connection(narrator.as_ref()).await;

    let app = create_router(static_dir, config, narrator, SessionConfig::from_env());
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log narrative backend connection status
async fn check_ai_connection(narrator: Option<&NarrativeClient>) {
    match narrator {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ Narrative backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  Narrative backend configured but not responding: {} (model: {}). Rule-based advice will be used on failure",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  Narrative backend not configured (set FINSIGHT_AI_API_KEY to enable AI advice)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "success": false,
            "message": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Bad input is the caller's problem and its message is safe to show
        if let Some(core) = err.downcast_ref::<finsight_core::Error>() {
            if core.is_validation() {
                return Self::bad_request(&core.to_string());
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

// ============================================================================
// Request Extraction
// ============================================================================

/// JSON body extractor that reports malformed bodies as `AppError`
///
/// Wrong JSON types, syntax errors and a missing content type all become a
/// 400 `{success: false, message}` instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                warn!(status = %rejection.status(), "Rejected request body");
                Err(AppError::bad_request(&rejection.body_text()))
            }
        }
    }
}

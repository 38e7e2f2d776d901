//! HTTP API: service descriptor, health route, and the send endpoint.
//!
//! The WhatsApp session handle is injected into the router state as a
//! trait object; handlers never touch process-wide globals.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::jid;
use crate::whatsapp::Bridge;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the WhatsApp session.
    pub bridge: Arc<dyn Bridge>,
}

/// Body of `POST /send-message`.
///
/// The recipient may arrive under either field name; `phone` wins when both
/// are present and non-empty.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Recipient as a bare phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Recipient as a chat id (JID or `@lid` form).
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<String>,
    /// Message text. Required, non-empty.
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of every `POST /send-message` response.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Whether the send was handed to the session.
    pub success: bool,
    /// Human-readable outcome on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The canonical recipient the message was sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Failure description on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendMessageResponse {
    fn sent(recipient: String) -> Self {
        Self {
            success: true,
            message: Some("message sent".to_owned()),
            recipient: Some(recipient),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            recipient: None,
            error: Some(error.into()),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the relay is serving.
    pub status: String,
    /// `"connected"` or `"disconnected"`, queried live from the session.
    pub whatsapp: String,
    /// RFC 3339 timestamp of this response.
    pub timestamp: String,
}

/// Build the router with all routes bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/send-message", post(send_message))
        .with_state(state)
}

/// Serve the API on `bind` until the process exits.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(bind: String, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind HTTP API to {bind}: {e}"))?;
    info!(addr = %bind, "HTTP API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// `GET /`: service descriptor listing the available endpoints.
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "warelay",
        "endpoints": {
            "health": "GET /health",
            "send_message": "POST /send-message",
        },
    }))
}

/// `GET /health`: liveness plus the session's connection flag.
///
/// The flag is queried from the session on every call, never cached.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.bridge.is_connected().await;
    Json(HealthResponse {
        status: "ok".to_owned(),
        whatsapp: if connected { "connected" } else { "disconnected" }.to_owned(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `POST /send-message`: validate, normalize the recipient, and hand the
/// message to the session.
///
/// Missing recipient or message → 400 before any session call. A rejected
/// send → 500 carrying the failure's message text; never retried.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> (StatusCode, Json<SendMessageResponse>) {
    let raw_recipient = req
        .phone
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| req.chat_id.as_deref().filter(|s| !s.is_empty()));
    let Some(raw_recipient) = raw_recipient else {
        return (
            StatusCode::BAD_REQUEST,
            Json(SendMessageResponse::failure(
                "missing required field: phone or chatId",
            )),
        );
    };
    let Some(message) = req.message.as_deref().filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(SendMessageResponse::failure(
                "missing required field: message",
            )),
        );
    };

    let recipient = jid::normalize(raw_recipient);
    match state.bridge.send_text(&recipient, message).await {
        Ok(()) => {
            info!(%recipient, "outbound message sent");
            (StatusCode::OK, Json(SendMessageResponse::sent(recipient)))
        }
        Err(e) => {
            warn!(%recipient, error = %e, "outbound send failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SendMessageResponse::failure(e.to_string())),
            )
        }
    }
}

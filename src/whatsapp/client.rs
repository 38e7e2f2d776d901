//! HTTP client for the WhatsApp bridge sidecar.
//!
//! All session operations go through this client: connection status,
//! outbound sends, contact/chat metadata lookups, and session lifecycle.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Bridge, WhatsAppError};

/// HTTP connect timeout for the reqwest client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for normal operations.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the bridge HTTP API.
pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
}

/// Connection status reported by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    /// Whether the bridge holds a live WhatsApp connection.
    pub connected: bool,
    /// The linked phone number, if connected.
    pub phone_number: Option<String>,
}

/// Contact metadata from the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactInfo {
    /// WhatsApp JID of the contact.
    pub jid: String,
    /// Numeric id (phone number) when the bridge knows it. More reliable
    /// than extracting digits from an `@lid` address.
    pub number: Option<String>,
    /// Display name, if known.
    pub name: Option<String>,
}

/// Chat metadata from the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    /// WhatsApp JID of the chat.
    pub jid: String,
    /// Display name, if the chat has one.
    pub name: Option<String>,
    /// Whether this is a group chat.
    #[serde(default)]
    pub is_group: bool,
}

/// Response envelope from the bridge HTTP API.
#[derive(Deserialize)]
struct BridgeResponse<T> {
    #[allow(dead_code)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl WhatsAppClient {
    /// Create a new client pointing at the given base URL.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self { client, base_url }
    }

    /// Get the current connection status from the bridge.
    pub async fn status(&self) -> Result<SessionStatus, WhatsAppError> {
        let url = format!("{}/status", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let body: BridgeResponse<SessionStatus> = resp.json().await?;
        body.data.ok_or(WhatsAppError::BridgeUnreachable)
    }

    /// Tell the bridge to initialize (or restore) the session, storing its
    /// state under `data_path`. The directory's contents are opaque to
    /// warelay. Pairing progress arrives on the event stream.
    pub async fn init_session(&self, data_path: &Path) -> Result<(), WhatsAppError> {
        let url = format!("{}/session/init", self.base_url);
        let body = serde_json::json!({ "data_path": data_path.display().to_string() });
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let reason = error_reason(resp, &format!("bridge returned {status}")).await;
            return Err(WhatsAppError::SessionInit(reason));
        }
        debug!(path = %data_path.display(), "session init requested");
        Ok(())
    }

    /// Tear the session down cleanly. Used on process shutdown.
    pub async fn close_session(&self) -> Result<(), WhatsAppError> {
        let url = format!("{}/session/close", self.base_url);
        self.client.post(&url).send().await?;
        debug!("session close requested");
        Ok(())
    }

    /// Send a text message to the given JID.
    pub async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError> {
        let url = format!("{}/send", self.base_url);
        let body = serde_json::json!({ "jid": jid, "text": text });
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let reason = error_reason(resp, &format!("bridge returned {status}")).await;
            warn!(%status, jid, "send failed: {reason}");
            return Err(WhatsAppError::SendRejected(reason));
        }
        debug!(jid, "message sent");
        Ok(())
    }

    /// Look up contact metadata by JID. `Ok(None)` when unknown.
    pub async fn contact(&self, jid: &str) -> Result<Option<ContactInfo>, WhatsAppError> {
        let url = format!("{}/contacts/{jid}", self.base_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: BridgeResponse<ContactInfo> = resp.json().await?;
        Ok(body.data)
    }

    /// Look up chat metadata by JID. `Ok(None)` when unknown.
    pub async fn chat(&self, jid: &str) -> Result<Option<ChatInfo>, WhatsAppError> {
        let url = format!("{}/chats/{jid}", self.base_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: BridgeResponse<ChatInfo> = resp.json().await?;
        Ok(body.data)
    }

    /// Returns the base URL of the bridge.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Extract the bridge's error text from a failed response, falling back to
/// `fallback` when the body carries none.
async fn error_reason(resp: reqwest::Response, fallback: &str) -> String {
    let body_text = resp.text().await.unwrap_or_default();
    serde_json::from_str::<BridgeResponse<serde_json::Value>>(&body_text)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| fallback.to_owned())
}

#[async_trait]
impl Bridge for WhatsAppClient {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError> {
        WhatsAppClient::send_text(self, jid, text).await
    }

    async fn is_connected(&self) -> bool {
        self.status().await.map(|s| s.connected).unwrap_or(false)
    }
}

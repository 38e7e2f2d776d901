//! Inbound relay: one WhatsApp message in, at most one webhook POST out.
//!
//! Every non-broadcast inbound message becomes a flat JSON record POSTed to
//! the configured webhook. Delivery is at-most-once: both outcomes are
//! logged, neither is retried, and a failure never propagates. The event
//! counts as handled regardless of the delivery outcome.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::is_webhook_configured;
use crate::jid;
use crate::whatsapp::client::{ChatInfo, ContactInfo, WhatsAppClient};
use crate::whatsapp::events::MessageEvent;

/// Display name used when neither the contact nor the chat has one.
const UNKNOWN_NAME: &str = "Unknown";

/// HTTP connect timeout for the webhook client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for the webhook POST.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Flat record POSTed to the webhook for each inbound message.
///
/// `from` and `chat` carry the same canonical JID; `isGroup` is derived
/// from the original, non-normalized sender field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Canonical sender JID.
    pub from: String,
    /// Canonical chat key (identical to `from`).
    pub chat: String,
    /// Message text.
    pub body: String,
    /// Sender display name, `"Unknown"` when absent.
    pub name: String,
    /// Message kind as reported by the bridge.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
    /// Whether the message came from a group chat.
    pub is_group: bool,
    /// Chat display name, falling back to `name`.
    pub chat_name: String,
    /// Whether the message carries media.
    pub has_media: bool,
}

/// Forwards inbound messages to the webhook.
pub struct InboundForwarder {
    http: reqwest::Client,
    webhook_url: String,
    client: Arc<WhatsAppClient>,
}

impl InboundForwarder {
    /// Create a forwarder POSTing to `webhook_url`, resolving sender
    /// metadata via `client`.
    pub fn new(webhook_url: String, client: Arc<WhatsAppClient>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            http,
            webhook_url,
            client,
        }
    }

    /// Relay one inbound message to the webhook.
    ///
    /// Status broadcasts are dropped silently. While the webhook URL is
    /// still the shipped placeholder, messages are dropped with a warning.
    /// Metadata lookup failures degrade to fallbacks; delivery failures are
    /// logged and swallowed.
    pub async fn handle_message(&self, msg: MessageEvent) {
        if jid::is_status_broadcast(&msg.from) {
            debug!("dropping status broadcast message");
            return;
        }
        if !is_webhook_configured(&self.webhook_url) {
            warn!(from = %msg.from, "webhook URL not configured, dropping inbound message");
            return;
        }

        let contact = match self.client.contact(&msg.from).await {
            Ok(contact) => contact,
            Err(e) => {
                warn!(from = %msg.from, error = %e, "contact lookup failed");
                None
            }
        };
        let chat = match self.client.chat(&msg.from).await {
            Ok(chat) => chat,
            Err(e) => {
                warn!(from = %msg.from, error = %e, "chat lookup failed");
                None
            }
        };

        let payload = build_payload(&msg, contact.as_ref(), chat.as_ref());

        match self.http.post(&self.webhook_url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(from = %payload.from, "inbound message relayed");
            }
            Ok(resp) => {
                warn!(from = %payload.from, status = %resp.status(), "webhook rejected inbound message");
            }
            Err(e) => {
                warn!(from = %payload.from, error = %e, "webhook delivery failed");
            }
        }
    }
}

/// Build the webhook record for one inbound message.
///
/// The normalizer input is the contact's numeric id when the bridge knows
/// it (authoritative for `@lid` senders), otherwise the event's `from`
/// field. The group flag comes from the original `from` before
/// normalization.
pub fn build_payload(
    msg: &MessageEvent,
    contact: Option<&ContactInfo>,
    chat: Option<&ChatInfo>,
) -> WebhookPayload {
    let normalizer_input = contact
        .and_then(|c| c.number.as_deref())
        .unwrap_or(&msg.from);
    let canonical = jid::normalize(normalizer_input);

    let name = contact
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| UNKNOWN_NAME.to_owned());
    let chat_name = chat
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| name.clone());

    WebhookPayload {
        from: canonical.clone(),
        chat: canonical,
        body: msg.body.clone(),
        name,
        message_type: msg.message_type.clone(),
        timestamp: msg.timestamp,
        is_group: jid::is_group(&msg.from),
        chat_name,
        has_media: msg.has_media,
    }
}

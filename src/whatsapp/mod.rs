//! WhatsApp adapter: HTTP bridge client, session events, and reconnect.
//!
//! Talks to a baileys-based sidecar ("the bridge") over HTTP and long-polls
//! it for real-time events. The bridge owns the session, from pairing and
//! protocol transport down to the session store on disk; this crate only
//! configures the store's location and reacts to notifications.

pub mod client;
pub mod events;
pub mod session;

use async_trait::async_trait;

/// Errors from the WhatsApp adapter.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// HTTP request to the bridge failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The bridge is not running or not reachable.
    #[error("bridge not reachable")]
    BridgeUnreachable,

    /// The bridge rejected an outbound send.
    #[error("send rejected: {0}")]
    SendRejected(String),

    /// Session initialization failed.
    #[error("session init failed: {0}")]
    SessionInit(String),

    /// Session could not be recovered within the configured attempt limit.
    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted {
        /// How many re-initialization attempts were made.
        attempts: u32,
    },
}

/// The outbound surface of the WhatsApp session.
///
/// The HTTP API receives this as a trait object injected at construction,
/// so tests can substitute a recording fake for the real bridge client.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Send a text message to a canonical JID.
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError>;

    /// Whether the session is currently connected. Queried live, never
    /// cached by callers.
    async fn is_connected(&self) -> bool;
}

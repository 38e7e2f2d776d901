//! Session event stream from the bridge.
//!
//! Long-polls the bridge's `/events/poll` endpoint and forwards events into
//! an mpsc channel consumed by the session event loop. Transport errors
//! reconnect automatically with capped, jittered exponential backoff.

use rand::Rng;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// An event emitted by the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// Pairing is required; `code` is the QR payload to show the operator.
    Qr {
        /// Raw QR payload.
        code: String,
    },
    /// Pairing was accepted.
    Authenticated,
    /// Pairing was rejected. Fatal for the relay.
    AuthFailure {
        /// Reason given by the bridge, if any.
        #[serde(default)]
        message: Option<String>,
    },
    /// The session is connected and messages will flow.
    Ready,
    /// The session dropped.
    Disconnected {
        /// Reason given by the bridge, if any.
        #[serde(default)]
        reason: Option<String>,
    },
    /// An inbound message arrived.
    Message(MessageEvent),
}

/// One inbound message as reported by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    /// JID the message came from (user, group, or broadcast form).
    pub from: String,
    /// Message text content.
    #[serde(default)]
    pub body: String,
    /// Message kind as reported by the bridge ("chat", "image", ...).
    #[serde(default = "default_message_type")]
    pub message_type: String,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub timestamp: i64,
    /// Whether the message carries media.
    #[serde(default)]
    pub has_media: bool,
}

fn default_message_type() -> String {
    "chat".to_owned()
}

/// Long-poll timeout for the HTTP client (seconds).
const POLL_TIMEOUT_SECS: u64 = 60;

/// Initial reconnect backoff (milliseconds).
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum reconnect backoff (milliseconds).
const MAX_BACKOFF_MS: u64 = 30_000;

/// Upper bound of the random jitter added to each backoff (milliseconds).
const JITTER_MS: u64 = 250;

/// Spawn the event listener as a background task.
///
/// Returns immediately. The listener forwards events to `event_tx` and
/// reconnects on transport errors; it exits when the receiver is dropped.
pub fn spawn_event_listener(
    base_url: String,
    event_tx: mpsc::Sender<BridgeEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let poll_url = format!("{base_url}/events/poll");
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            info!(url = %poll_url, "connecting to bridge event stream");

            match poll_events(&poll_url, &event_tx).await {
                Ok(()) => {
                    info!("bridge event stream closed");
                    break;
                }
                Err(e) => {
                    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
                    let delay_ms = backoff_ms.saturating_add(jitter);
                    warn!(error = %e, delay_ms, "event stream error, reconnecting");
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                }
            }
        }
    })
}

/// Poll the bridge for events in a loop. Returns `Err` on non-timeout
/// transport errors so the caller can reconnect with backoff.
async fn poll_events(
    poll_url: &str,
    event_tx: &mpsc::Sender<BridgeEvent>,
) -> Result<(), reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(POLL_TIMEOUT_SECS))
        .build()?;

    loop {
        match client.get(poll_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<Vec<BridgeEvent>>().await {
                    Ok(events) => {
                        for event in events {
                            debug!(?event, "received bridge event");
                            if event_tx.send(event).await.is_err() {
                                // Receiver dropped, shut down cleanly.
                                return Ok(());
                            }
                        }
                    }
                    Err(e) => debug!(error = %e, "ignoring malformed event batch"),
                }
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "event poll returned non-200");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
            Err(e) if e.is_timeout() => {
                // Normal: long-poll window expired, retry immediately.
                continue;
            }
            Err(e) => {
                return Err(e);
            }
        }
    }
}

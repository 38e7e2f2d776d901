//! Session recovery: bounded re-initialization after a disconnect.
//!
//! A dropped session is recovered by asking the bridge to initialize again,
//! up to a configured number of attempts with capped exponential backoff.
//! Exhausting the attempts is an error the caller must treat as fatal.

use std::path::Path;

use rand::Rng;
use tracing::{info, warn};

use crate::config::ReconnectConfig;

use super::client::WhatsAppClient;
use super::WhatsAppError;

/// Upper bound of the random jitter added to each delay (milliseconds).
const JITTER_MS: u64 = 250;

/// Largest backoff exponent considered; keeps the doubling well away from
/// overflow even with large base delays.
const MAX_EXPONENT: u32 = 10;

/// Delay before the given 1-based reconnect attempt: the base delay doubled
/// per attempt, capped at the configured maximum. Jitter is added by
/// [`reinitialize`], not here.
pub fn backoff_delay(policy: &ReconnectConfig, attempt: u32) -> std::time::Duration {
    let exp = attempt.saturating_sub(1).min(MAX_EXPONENT);
    let ms = policy
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(exp))
        .min(policy.max_delay_ms);
    std::time::Duration::from_millis(ms)
}

/// Recover a dropped session.
///
/// Sleeps, then asks the bridge to initialize with the same session
/// directory, repeating with growing delays until it succeeds or the
/// attempts are spent.
pub async fn reinitialize(
    client: &WhatsAppClient,
    session_dir: &Path,
    policy: &ReconnectConfig,
) -> Result<(), WhatsAppError> {
    for attempt in 1..=policy.max_attempts {
        let jitter = std::time::Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_MS));
        let delay = backoff_delay(policy, attempt).saturating_add(jitter);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        warn!(attempt, max = policy.max_attempts, delay_ms, "reconnecting session");
        tokio::time::sleep(delay).await;

        match client.init_session(session_dir).await {
            Ok(()) => {
                info!(attempt, "session reinitialized");
                return Ok(());
            }
            Err(e) => warn!(attempt, error = %e, "session reinit failed"),
        }
    }
    Err(WhatsAppError::ReconnectExhausted {
        attempts: policy.max_attempts,
    })
}

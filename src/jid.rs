//! WhatsApp address normalization.
//!
//! Addresses arrive in several shapes: canonical user JIDs
//! (`{digits}@c.us`), group JIDs (`{digits}-{ts}@g.us`), bare phone numbers
//! with arbitrary formatting, and the newer privacy-preserving `@lid` form.
//! The webhook contract speaks canonical user JIDs only, so both the
//! inbound and outbound paths funnel every address through [`normalize`].

/// Canonical user domain suffix.
pub const USER_SUFFIX: &str = "@c.us";

/// Group domain suffix.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Linked-device id suffix. The user part of a `@lid` address is not
/// guaranteed to be the real phone number.
pub const LID_SUFFIX: &str = "@lid";

/// Pseudo-chat JID carrying status broadcasts.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Normalize a raw WhatsApp address to its canonical form.
///
/// - `@lid` addresses have the suffix textually replaced with `@c.us`.
///   This is a best-effort mapping: the `@lid` user part may not be the
///   real number, and no authoritative lookup exists on the bridge surface.
///   Callers holding a contact-provided number should normalize that
///   instead.
/// - Bare numbers (no `@`) have every non-digit stripped and the canonical
///   suffix appended: `"+49 171-555"` becomes `"49171555@c.us"`.
/// - Everything else (canonical user JIDs, group JIDs, broadcast JIDs)
///   passes through unchanged.
///
/// Pure and total: always returns a string, idempotent on recognized forms.
pub fn normalize(raw: &str) -> String {
    if let Some(user) = raw.strip_suffix(LID_SUFFIX) {
        return format!("{user}{USER_SUFFIX}");
    }
    if !raw.contains('@') {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        return format!("{digits}{USER_SUFFIX}");
    }
    raw.to_owned()
}

/// Whether a raw (non-normalized) address refers to a group chat.
pub fn is_group(raw: &str) -> bool {
    raw.ends_with(GROUP_SUFFIX)
}

/// Whether an address is the status broadcast pseudo-chat.
pub fn is_status_broadcast(raw: &str) -> bool {
    raw == STATUS_BROADCAST
}

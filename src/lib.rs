//! Warelay — a WhatsApp-to-webhook relay.
//!
//! Single Rust binary. Inbound WhatsApp messages are normalized and POSTed
//! to one configured webhook; a small HTTP API accepts outbound send
//! requests and hands them to the WhatsApp session. The session itself is
//! owned by a baileys-based HTTP sidecar; warelay drives it and reacts to
//! its notifications, nothing more.
//!
//! See `DESIGN.md` for the architecture and the normalization contract.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod jid;
pub mod logging;
pub mod relay;
pub mod server;
pub mod whatsapp;

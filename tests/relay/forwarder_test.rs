//! Coverage for the inbound forwarder: payload shape, filtering, delivery.

use std::sync::Arc;

use warelay::config::WEBHOOK_URL_PLACEHOLDER;
use warelay::relay::{build_payload, InboundForwarder};
use warelay::whatsapp::client::{ChatInfo, ContactInfo, WhatsAppClient};
use warelay::whatsapp::events::MessageEvent;

fn message(from: &str) -> MessageEvent {
    MessageEvent {
        from: from.to_owned(),
        body: "hello".to_owned(),
        message_type: "chat".to_owned(),
        timestamp: 1_700_000_000,
        has_media: false,
    }
}

fn contact(number: Option<&str>, name: Option<&str>) -> ContactInfo {
    ContactInfo {
        jid: "111222333@lid".to_owned(),
        number: number.map(str::to_owned),
        name: name.map(str::to_owned),
    }
}

fn chat(name: Option<&str>, is_group: bool) -> ChatInfo {
    ChatInfo {
        jid: "111222333@lid".to_owned(),
        name: name.map(str::to_owned),
        is_group,
    }
}

// ── build_payload ──

#[test]
fn contact_number_is_preferred_as_normalizer_input() {
    let msg = message("111222333@lid");
    let contact = contact(Some("491715551234"), Some("Ada"));
    let payload = build_payload(&msg, Some(&contact), None);

    assert_eq!(payload.from, "491715551234@c.us");
    assert_eq!(payload.chat, payload.from);
}

#[test]
fn falls_back_to_event_sender_without_contact() {
    let msg = message("111222333@lid");
    let payload = build_payload(&msg, None, None);

    assert_eq!(payload.from, "111222333@c.us");
}

#[test]
fn group_flag_derives_from_original_sender() {
    let msg = message("123456-1601234567@g.us");
    let contact = contact(Some("491715551234"), None);
    let payload = build_payload(&msg, Some(&contact), None);

    // Normalization rewrote the identifier, the flag still reflects the
    // original group form.
    assert_eq!(payload.from, "491715551234@c.us");
    assert!(payload.is_group);
}

#[test]
fn direct_chat_is_not_flagged_as_group() {
    let payload = build_payload(&message("491715551234@c.us"), None, None);
    assert!(!payload.is_group);
}

#[test]
fn name_falls_back_to_placeholder() {
    let payload = build_payload(&message("491715551234@c.us"), None, None);
    assert_eq!(payload.name, "Unknown");
    assert_eq!(payload.chat_name, "Unknown");
}

#[test]
fn chat_name_falls_back_to_contact_name() {
    let msg = message("491715551234@c.us");
    let contact = contact(None, Some("Ada"));
    let payload = build_payload(&msg, Some(&contact), Some(&chat(None, false)));

    assert_eq!(payload.name, "Ada");
    assert_eq!(payload.chat_name, "Ada");
}

#[test]
fn chat_name_wins_when_present() {
    let msg = message("491715551234@c.us");
    let contact = contact(None, Some("Ada"));
    let payload = build_payload(&msg, Some(&contact), Some(&chat(Some("Team"), true)));

    assert_eq!(payload.chat_name, "Team");
}

#[test]
fn message_fields_are_copied() {
    let mut msg = message("491715551234@c.us");
    msg.message_type = "image".to_owned();
    msg.has_media = true;
    let payload = build_payload(&msg, None, None);

    assert_eq!(payload.body, "hello");
    assert_eq!(payload.message_type, "image");
    assert_eq!(payload.timestamp, 1_700_000_000);
    assert!(payload.has_media);
}

#[test]
fn wire_form_uses_camel_case_fields() {
    let value =
        serde_json::to_value(build_payload(&message("491715551234@c.us"), None, None))
            .expect("payload serializes");

    for key in ["from", "chat", "body", "name", "type", "timestamp", "isGroup", "chatName", "hasMedia"] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
}

// ── handle_message ──

#[tokio::test]
async fn status_broadcast_is_never_relayed() {
    let mut webhook = mockito::Server::new_async().await;
    let hook = webhook.mock("POST", "/hook").expect(0).create_async().await;

    // The bridge is never contacted either: port 1 would refuse.
    let client = Arc::new(WhatsAppClient::new("http://127.0.0.1:1".to_owned()));
    let forwarder = InboundForwarder::new(format!("{}/hook", webhook.url()), client);

    forwarder.handle_message(message("status@broadcast")).await;

    hook.assert_async().await;
}

#[tokio::test]
async fn placeholder_webhook_drops_messages() {
    let mut bridge = mockito::Server::new_async().await;
    let lookups = bridge
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = Arc::new(WhatsAppClient::new(bridge.url()));
    let forwarder = InboundForwarder::new(WEBHOOK_URL_PLACEHOLDER.to_owned(), client);

    forwarder.handle_message(message("491715551234@c.us")).await;

    // Dropped before any lookup or delivery attempt.
    lookups.assert_async().await;
}

#[tokio::test]
async fn relays_normalized_payload() {
    let mut bridge = mockito::Server::new_async().await;
    let contact_lookup = bridge
        .mock("GET", "/contacts/111222333@lid")
        .with_body(
            r#"{"success":true,"data":{"jid":"111222333@lid","number":"491715551234","name":"Ada"}}"#,
        )
        .create_async()
        .await;
    let chat_lookup = bridge
        .mock("GET", "/chats/111222333@lid")
        .with_body(r#"{"success":true,"data":{"jid":"111222333@lid","name":"Ada","is_group":false}}"#)
        .create_async()
        .await;

    let mut webhook = mockito::Server::new_async().await;
    let hook = webhook
        .mock("POST", "/hook")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "from": "491715551234@c.us",
            "chat": "491715551234@c.us",
            "body": "hello",
            "name": "Ada",
            "chatName": "Ada",
            "isGroup": false,
        })))
        .create_async()
        .await;

    let client = Arc::new(WhatsAppClient::new(bridge.url()));
    let forwarder = InboundForwarder::new(format!("{}/hook", webhook.url()), client);

    forwarder.handle_message(message("111222333@lid")).await;

    contact_lookup.assert_async().await;
    chat_lookup.assert_async().await;
    hook.assert_async().await;
}

#[tokio::test]
async fn webhook_failure_is_swallowed() {
    let bridge = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let hook = webhook
        .mock("POST", "/hook")
        .with_status(500)
        .create_async()
        .await;

    // Unmatched bridge lookups degrade to fallbacks; the delivery failure
    // is logged and swallowed, so this must simply return.
    let client = Arc::new(WhatsAppClient::new(bridge.url()));
    let forwarder = InboundForwarder::new(format!("{}/hook", webhook.url()), client);

    forwarder.handle_message(message("491715551234@c.us")).await;

    hook.assert_async().await;
}

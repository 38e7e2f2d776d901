//! Coverage for the send endpoint: validation, normalization, failure paths.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use warelay::server::{send_message, AppState, SendMessageRequest, SendMessageResponse};
use warelay::whatsapp::{Bridge, WhatsAppError};

/// Fake session recording every send; optionally failing instead.
#[derive(Default)]
struct RecordingBridge {
    fail_with: Option<String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingBridge {
    fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_owned()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait::async_trait]
impl Bridge for RecordingBridge {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError> {
        if let Some(reason) = &self.fail_with {
            return Err(WhatsAppError::SendRejected(reason.clone()));
        }
        self.sent
            .lock()
            .expect("lock")
            .push((jid.to_owned(), text.to_owned()));
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

fn state(bridge: &Arc<RecordingBridge>) -> AppState {
    AppState {
        bridge: Arc::clone(bridge) as Arc<dyn Bridge>,
    }
}

async fn post(
    state: AppState,
    body: serde_json::Value,
) -> (StatusCode, Json<SendMessageResponse>) {
    let req: SendMessageRequest = serde_json::from_value(body).expect("request deserializes");
    send_message(State(state), Json(req)).await
}

#[tokio::test]
async fn missing_recipient_is_rejected() {
    let bridge = Arc::new(RecordingBridge::default());
    let (status, Json(resp)) = post(state(&bridge), serde_json::json!({ "message": "hi" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!resp.success);
    assert!(resp.error.expect("error set").contains("phone or chatId"));
    // Validation failures never reach the session.
    assert!(bridge.sent().is_empty());
}

#[tokio::test]
async fn missing_message_is_rejected() {
    let bridge = Arc::new(RecordingBridge::default());
    let (status, Json(resp)) =
        post(state(&bridge), serde_json::json!({ "phone": "123456" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp.error.expect("error set").contains("message"));
    assert!(bridge.sent().is_empty());
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let bridge = Arc::new(RecordingBridge::default());
    let (status, _) = post(
        state(&bridge),
        serde_json::json!({ "phone": "123456", "message": "" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(bridge.sent().is_empty());
}

#[tokio::test]
async fn phone_is_normalized_before_sending() {
    let bridge = Arc::new(RecordingBridge::default());
    let (status, Json(resp)) = post(
        state(&bridge),
        serde_json::json!({ "phone": "123-456", "message": "hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(resp.success);
    assert_eq!(resp.recipient.as_deref(), Some("123456@c.us"));
    assert_eq!(bridge.sent(), vec![("123456@c.us".to_owned(), "hi".to_owned())]);
}

#[tokio::test]
async fn lid_chat_id_is_normalized_before_sending() {
    let bridge = Arc::new(RecordingBridge::default());
    let (status, Json(resp)) = post(
        state(&bridge),
        serde_json::json!({ "chatId": "999@lid", "message": "hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp.recipient.as_deref(), Some("999@c.us"));
    assert_eq!(bridge.sent(), vec![("999@c.us".to_owned(), "hi".to_owned())]);
}

#[tokio::test]
async fn group_chat_id_passes_through_unchanged() {
    let bridge = Arc::new(RecordingBridge::default());
    let (status, _) = post(
        state(&bridge),
        serde_json::json!({ "chatId": "123456-1601234567@g.us", "message": "hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        bridge.sent(),
        vec![("123456-1601234567@g.us".to_owned(), "hi".to_owned())]
    );
}

#[tokio::test]
async fn phone_wins_over_chat_id() {
    let bridge = Arc::new(RecordingBridge::default());
    let (_, Json(resp)) = post(
        state(&bridge),
        serde_json::json!({ "phone": "111", "chatId": "999@lid", "message": "hi" }),
    )
    .await;

    assert_eq!(resp.recipient.as_deref(), Some("111@c.us"));
}

#[tokio::test]
async fn empty_phone_falls_back_to_chat_id() {
    let bridge = Arc::new(RecordingBridge::default());
    let (_, Json(resp)) = post(
        state(&bridge),
        serde_json::json!({ "phone": "", "chatId": "999@lid", "message": "hi" }),
    )
    .await;

    assert_eq!(resp.recipient.as_deref(), Some("999@c.us"));
}

#[tokio::test]
async fn send_failure_maps_to_500_with_reason() {
    let bridge = Arc::new(RecordingBridge::failing("session dropped"));
    let (status, Json(resp)) = post(
        state(&bridge),
        serde_json::json!({ "phone": "123456", "message": "hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!resp.success);
    assert!(resp.error.expect("error set").contains("session dropped"));
}

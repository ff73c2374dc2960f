// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook event types.
//!
//! Two payload shapes arrive on the same endpoint: the one-time
//! `url_verification` challenge and v2 event callbacks. Only message events
//! are of interest; everything else is ignored upstream.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub header: Option<EventHeader>,
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

#[derive(Debug, Deserialize)]
pub struct EventHeader {
    #[serde(default)]
    pub event_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub sender: Option<Sender>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    /// JSON-encoded body, shape depends on `message_type`.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub sender_id: Option<SenderId>,
}

#[derive(Debug, Deserialize)]
pub struct SenderId {
    #[serde(default)]
    pub open_id: Option<String>,
}

/// A normalized inbound message, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub message_id: String,
    pub chat_id: String,
    /// Platform-native sender id; falls back to the chat id for group bots
    /// that do not expose one.
    pub open_id: String,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    Text(String),
    Image { image_key: String },
    Unsupported { message_type: String },
}

impl WebhookPayload {
    /// The challenge string for `url_verification` handshakes.
    pub fn challenge(&self) -> Option<&str> {
        if self.kind.as_deref() == Some("url_verification") {
            self.challenge.as_deref()
        } else {
            None
        }
    }

    /// Normalizes an event callback into an [`Inbound`], or `None` for
    /// non-message events and malformed payloads.
    pub fn inbound(&self) -> Option<Inbound> {
        let header = self.header.as_ref()?;
        if !header
            .event_type
            .as_deref()
            .is_some_and(|t| t.contains("message"))
        {
            return None;
        }
        let message = self.event.as_ref()?.message.as_ref()?;
        let message_id = message.message_id.clone()?;
        let chat_id = message.chat_id.clone()?;
        let open_id = self
            .event
            .as_ref()
            .and_then(|e| e.sender.as_ref())
            .and_then(|s| s.sender_id.as_ref())
            .and_then(|s| s.open_id.clone())
            .unwrap_or_else(|| chat_id.clone());

        let content = message.content.as_deref().unwrap_or_default();
        let kind = match message.message_type.as_deref() {
            Some("text") => InboundKind::Text(extract_text(content)),
            Some("image") => match extract_image_key(content) {
                Some(image_key) => InboundKind::Image { image_key },
                None => InboundKind::Unsupported {
                    message_type: "image".into(),
                },
            },
            other => InboundKind::Unsupported {
                message_type: other.unwrap_or("unknown").to_string(),
            },
        };

        Some(Inbound {
            message_id,
            chat_id,
            open_id,
            kind,
        })
    }
}

/// Text bodies are `{"text": "..."}`; fall back to the raw content and strip
/// stray surrounding quotes.
fn extract_text(content: &str) -> String {
    let text = serde_json::from_str::<Value>(content)
        .ok()
        .and_then(|v| v.get("text").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| content.to_string());
    text.trim().trim_matches(['"', '\'']).trim().to_string()
}

fn extract_image_key(content: &str) -> Option<String> {
    serde_json::from_str::<Value>(content)
        .ok()?
        .get("image_key")
        .and_then(Value::as_str)
        .map(str::to_string)
}

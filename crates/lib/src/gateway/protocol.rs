//! Webhook payloads for page messaging: verification query and event delivery body.

use crate::channels::{InboundMessage, MESSENGER_CHANNEL_ID};
use serde::Deserialize;

/// Query string of the verification handshake (`GET /webhook`).
/// The platform sends the dotted `hub.*` names; bare names are accepted too.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", alias = "mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", alias = "verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", alias = "challenge")]
    pub challenge: Option<String>,
}

/// Outcome of checking a verification handshake.
#[derive(Debug, PartialEq, Eq)]
pub enum Verification {
    /// Echo this challenge back as plain text.
    Accepted(String),
    /// Mode or token present but wrong, or no secret configured.
    Rejected,
    /// `mode` or `verify_token` missing.
    Incomplete,
}

impl VerifyParams {
    pub fn verify(self, expected_token: Option<&str>) -> Verification {
        let (Some(mode), Some(token)) = (self.mode, self.verify_token) else {
            return Verification::Incomplete;
        };
        match expected_token {
            Some(expected) if mode == "subscribe" && token == expected => {
                Verification::Accepted(self.challenge.unwrap_or_default())
            }
            _ => Verification::Rejected,
        }
    }
}

/// Event delivery body (`POST /webhook`). `messaging` items are kept raw so that one
/// unexpected event does not reject the whole batch. A missing or `null` list is empty.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Option<Vec<serde_json::Value>>,
}

/// One `entry[].messaging[]` item. Delivery and read receipts, postbacks, and reactions
/// have no `message.text` and are skipped.
#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    #[serde(default)]
    pub sender: Option<Party>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Party {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on copies of messages the page itself sent.
    #[serde(default)]
    pub is_echo: bool,
}

impl MessagingEvent {
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        if message.is_echo {
            return None;
        }
        let text = message.text?;
        let sender = self.sender?;
        Some(InboundMessage::new(MESSENGER_CHANNEL_ID, sender.id, text))
    }
}

/// Why an event delivery body was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum PayloadError {
    /// Body is not JSON, or its top-level structure has the wrong types.
    Malformed,
    /// `object` is not "page".
    NotPage,
}

impl WebhookPayload {
    /// Parse a delivery body and collect the messages worth answering.
    pub fn parse_inbound(body: &[u8]) -> Result<Vec<InboundMessage>, PayloadError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| PayloadError::Malformed)?;
        if value.get("object").and_then(|o| o.as_str()) != Some("page") {
            return Err(PayloadError::NotPage);
        }
        let payload: WebhookPayload =
            serde_json::from_value(value).map_err(|_| PayloadError::Malformed)?;
        Ok(payload
            .entry
            .unwrap_or_default()
            .into_iter()
            .flat_map(|e| e.messaging.unwrap_or_default())
            .filter_map(|raw| match serde_json::from_value::<MessagingEvent>(raw) {
                Ok(event) => event.into_inbound(),
                Err(e) => {
                    log::debug!("webhook: skipping unrecognized messaging event: {}", e);
                    None
                }
            })
            .collect())
    }
}

//! Messenger channel: replies through the Graph API Send API. Inbound events arrive on the
//! gateway's `/webhook` route.

use crate::channels::registry::ChannelHandle;
use crate::config::MessengerChannelConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const MESSENGER_CHANNEL_ID: &str = "messenger";

/// Send API limit for text messages.
const MAX_MESSAGE_CHARS: usize = 2000;
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: OutboundText<'a>,
    messaging_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    text: &'a str,
}

/// Outbound connector for page messaging.
pub struct MessengerChannel {
    send_url: String,
    page_access_token: Option<String>,
    client: reqwest::Client,
}

impl MessengerChannel {
    pub fn new(send_url: impl Into<String>, page_access_token: Option<String>) -> Self {
        Self {
            send_url: send_url.into(),
            page_access_token,
            client: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn from_config(config: &MessengerChannelConfig) -> Self {
        Self::new(config.send_url.clone(), config.page_access_token.clone())
    }

    /// POST a RESPONSE-type text message to `recipient_id`.
    pub async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), String> {
        let token = self
            .page_access_token
            .as_deref()
            .ok_or("messenger page access token not configured")?;
        let body = SendRequest {
            recipient: Recipient { id: recipient_id },
            message: OutboundText { text },
            messaging_type: "RESPONSE",
        };
        let res = self
            .client
            .post(&self.send_url)
            .query(&[("access_token", token)])
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("send api failed: {} {}", status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for MessengerChannel {
    fn id(&self) -> &str {
        MESSENGER_CHANNEL_ID
    }

    fn max_message_chars(&self) -> usize {
        MAX_MESSAGE_CHARS
    }

    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        self.send_text(conversation_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_body_shape() {
        let body = SendRequest {
            recipient: Recipient { id: "U1" },
            message: OutboundText { text: "hello" },
            messaging_type: "RESPONSE",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "recipient": { "id": "U1" },
                "message": { "text": "hello" },
                "messaging_type": "RESPONSE"
            })
        );
    }

    #[tokio::test]
    async fn missing_token_fails_without_network() {
        let ch = MessengerChannel::new("http://127.0.0.1:9/unused", None);
        let err = ch.send_text("U1", "hi").await.unwrap_err();
        assert!(err.contains("page access token"));
    }
}

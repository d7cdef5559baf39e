//! Ollama API client (http://localhost:11434 by default).
//! Non-streaming chat only: the relay waits for the complete reply before answering.

use crate::config::InferenceConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sent to the user when no inference server URL is configured.
pub const CONFIG_ERROR_REPLY: &str =
    "Error: the AI model server is not configured. Please contact the bot administrator.";
/// Sent to the user when the server cannot be reached, times out, or answers with an error status.
pub const UNREACHABLE_REPLY: &str =
    "I'm sorry, my local Ollama server is unreachable or turned off.";
/// Sent to the user when the server answers 2xx with a body we cannot read a reply from.
pub const UNPARSEABLE_REPLY: &str = "Error: Could not parse response from the AI model.";

/// Client for Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: Option<String>,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("ollama base url is not configured")]
    NotConfigured,
    #[error("ollama request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ollama api error: {0}")]
    Api(String),
    #[error("ollama response malformed: {0}")]
    Malformed(String),
}

impl OllamaError {
    /// User-facing text that stands in for a model reply after this failure.
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            OllamaError::NotConfigured => CONFIG_ERROR_REPLY,
            OllamaError::Request(_) | OllamaError::Api(_) => UNREACHABLE_REPLY,
            OllamaError::Malformed(_) => UNPARSEABLE_REPLY,
        }
    }
}

impl OllamaClient {
    /// `base_url` of `None` yields a client whose every call fails with [`OllamaError::NotConfigured`].
    pub fn new(base_url: Option<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("ollama: building http client with timeout failed ({}), using defaults", e);
                reqwest::Client::new()
            });
        Self {
            base_url,
            model: model.into(),
            client,
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> Result<String, OllamaError> {
        let base = self.base_url.as_ref().ok_or(OllamaError::NotConfigured)?;
        Ok(format!("{}{}", base, path))
    }

    /// GET /api/tags: list available models.
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>, OllamaError> {
        let url = self.endpoint("/api/tags")?;
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(OllamaError::Api(format!("{} {}", status, body)));
        }
        let data: TagsResponse = res.json().await?;
        Ok(data.models.unwrap_or_default())
    }

    /// Log whether the configured model is installed. Not fatal: the first chat call
    /// reports any problem to the user.
    pub async fn check_model(&self) {
        match self.list_models().await {
            Ok(models) => {
                // "llama3" matches "llama3:latest".
                let found = models.iter().any(|m| {
                    m.name == self.model || m.name.split(':').next() == Some(self.model.as_str())
                });
                if found {
                    log::info!("ollama model {} is available", self.model);
                } else {
                    log::warn!(
                        "ollama model {} not found on the server ({} model(s) installed)",
                        self.model,
                        models.len()
                    );
                }
            }
            Err(e) => log::debug!("ollama model discovery failed: {}", e),
        }
    }

    /// POST /api/chat with stream: false.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, OllamaError> {
        let url = self.endpoint("/api/chat")?;
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(OllamaError::Api(format!("{} {}", status, body)));
        }
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            OllamaError::Malformed(format!("{} (body: {})", e, String::from_utf8_lossy(&bytes)))
        })
    }

    /// Ask the model to answer `text` as a single user message.
    ///
    /// Never fails: every error is logged and replaced by one of the fixed fallback replies,
    /// so the result can always be sent back to the chat as is.
    pub async fn reply(&self, text: &str) -> String {
        let result = self
            .chat(vec![ChatMessage::user(text)])
            .await
            .and_then(|res| match res.content() {
                Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
                _ => Err(OllamaError::Malformed(format!(
                    "no message.content in {:?}",
                    res
                ))),
            });
        match result {
            Ok(content) => content,
            Err(e) => {
                log::warn!("querying ollama at {:?} failed: {}", self.base_url, e);
                e.fallback_reply().to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaModel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Option<Vec<OllamaModel>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

/// Assistant message as returned by Ollama; fields are optional so that a missing
/// `content` is reported as a malformed reply rather than a decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text content of the assistant message, if any.
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "llama3",
            messages: vec![ChatMessage::user("hello")],
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "llama3",
                "messages": [{ "role": "user", "content": "hello" }],
                "stream": false
            })
        );
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = OllamaClient::new(
            Some("http://localhost:11434/".to_string()),
            "llama3",
            Duration::from_secs(1),
        );
        assert_eq!(client.base_url(), Some("http://localhost:11434"));
        assert_eq!(
            client.endpoint("/api/chat").unwrap(),
            "http://localhost:11434/api/chat"
        );
    }

    #[test]
    fn blank_base_url_is_not_configured() {
        let client = OllamaClient::new(Some("  ".to_string()), "llama3", Duration::from_secs(1));
        assert!(matches!(
            client.endpoint("/api/chat"),
            Err(OllamaError::NotConfigured)
        ));
    }

    #[test]
    fn response_content_extraction() {
        let res: ChatResponse =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":"X"},"done":true}"#)
                .unwrap();
        assert_eq!(res.content(), Some("X"));

        let res: ChatResponse = serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert_eq!(res.content(), None);
    }

    #[test]
    fn fallback_replies_are_distinct_and_non_empty() {
        let replies = [CONFIG_ERROR_REPLY, UNREACHABLE_REPLY, UNPARSEABLE_REPLY];
        for r in replies {
            assert!(!r.is_empty());
        }
        assert_ne!(CONFIG_ERROR_REPLY, UNREACHABLE_REPLY);
        assert_ne!(UNREACHABLE_REPLY, UNPARSEABLE_REPLY);
        assert_ne!(CONFIG_ERROR_REPLY, UNPARSEABLE_REPLY);
        assert_eq!(OllamaError::NotConfigured.fallback_reply(), CONFIG_ERROR_REPLY);
        assert_eq!(
            OllamaError::Api("502 Bad Gateway".into()).fallback_reply(),
            UNREACHABLE_REPLY
        );
        assert_eq!(
            OllamaError::Malformed("x".into()).fallback_reply(),
            UNPARSEABLE_REPLY
        );
    }

    #[tokio::test]
    async fn unconfigured_client_replies_with_config_error() {
        let client = OllamaClient::new(None, "llama3", Duration::from_secs(1));
        assert_eq!(client.reply("hi").await, CONFIG_ERROR_REPLY);
    }
}

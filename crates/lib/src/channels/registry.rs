//! Channel registry: the outbound side of each channel, looked up by id when a reply is ready.

use crate::channels::chunk::split_message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Outbound half of a channel (send a reply to a conversation).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;

    /// Longest text the platform accepts in a single message, in characters.
    fn max_message_chars(&self) -> usize;

    /// Send one text message to a conversation. One attempt, no retries.
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String>;

    /// Send `text`, split into several messages when it exceeds [`Self::max_message_chars`].
    /// Stops at the first failed piece.
    async fn send_reply(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        for piece in split_message(text, self.max_message_chars()) {
            self.send_message(conversation_id, &piece).await?;
        }
        Ok(())
    }
}

/// Registry of channel ids to handles. Built once at startup, read-only afterwards.
#[derive(Default, Clone)]
pub struct ChannelRegistry {
    inner: HashMap<String, Arc<dyn ChannelHandle>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel under its own id, replacing any previous handle with that id.
    pub fn with(mut self, handle: Arc<dyn ChannelHandle>) -> Self {
        self.inner.insert(handle.id().to_string(), handle);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ChannelHandle>> {
        self.inner.get(id).cloned()
    }
}

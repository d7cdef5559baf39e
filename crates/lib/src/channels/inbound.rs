//! Inbound message from a channel: handed to the dispatcher, answered once, then dropped.

/// A text message from a channel that should be answered by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel that received the message and will carry the reply (e.g. "telegram").
    pub channel_id: String,
    /// Where to send the reply: Telegram chat id or Messenger sender id.
    pub conversation_id: String,
    pub text: String,
    /// Display name of the sender, for logs only.
    pub sender_name: Option<String>,
}

impl InboundMessage {
    pub fn new(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            text: text.into(),
            sender_name: None,
        }
    }

    pub fn with_sender_name(mut self, name: Option<String>) -> Self {
        self.sender_name = name;
        self
    }
}

//! Dispatcher: turns each inbound message into one model call and one reply.
//!
//! Every message is handled on its own task so a slow inference call never holds up
//! intake. There is no shared mutable state between messages.

use crate::channels::{ChannelRegistry, InboundMessage};
use crate::llm::OllamaClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the inbound queue between channels and the dispatcher.
pub const INBOUND_QUEUE: usize = 64;

/// Answer one inbound message: ask the model, then send the reply (or the fallback text)
/// back through the channel the message came from.
pub async fn handle_inbound(
    registry: &ChannelRegistry,
    ollama: &OllamaClient,
    msg: InboundMessage,
) -> Result<(), String> {
    log::info!(
        "received message in {} chat {} from {}",
        msg.channel_id,
        msg.conversation_id,
        msg.sender_name.as_deref().unwrap_or("unknown")
    );
    let handle = registry
        .get(&msg.channel_id)
        .ok_or_else(|| format!("no channel registered for {}", msg.channel_id))?;
    let reply = ollama.reply(&msg.text).await;
    handle.send_reply(&msg.conversation_id, &reply).await
}

/// Receive inbound messages until every sender is dropped, spawning one task per message.
pub fn spawn_dispatcher(
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
    registry: Arc<ChannelRegistry>,
    ollama: OllamaClient,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            let registry = registry.clone();
            let ollama = ollama.clone();
            tokio::spawn(async move {
                let channel_id = msg.channel_id.clone();
                let conversation_id = msg.conversation_id.clone();
                if let Err(e) = handle_inbound(&registry, &ollama, msg).await {
                    log::warn!(
                        "reply to {} chat {} failed: {}",
                        channel_id,
                        conversation_id,
                        e
                    );
                }
            });
        }
        log::debug!("dispatcher: inbound queue closed");
    })
}

//! Polling front-end: Telegram long poll → Ollama → sendMessage.

use crate::channels::{ChannelHandle, ChannelRegistry, TelegramChannel};
use crate::config::{Config, DEFAULT_OLLAMA_URL};
use crate::llm::OllamaClient;
use crate::relay::{spawn_dispatcher, INBOUND_QUEUE};
use crate::signal::shutdown_signal;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Run the Telegram bot until Ctrl+C / SIGTERM.
///
/// Fails before doing anything else when no bot token is configured. When no inference
/// URL is configured, the local default (`http://localhost:11434`) is used.
pub async fn run_polling(config: Config) -> Result<()> {
    run_polling_until(config, shutdown_signal()).await
}

/// Like [`run_polling`] but stops when `shutdown` completes.
pub async fn run_polling_until(config: Config, shutdown: impl Future<Output = ()>) -> Result<()> {
    let token = config.require_telegram_token()?;
    let mut inference = config.inference.clone();
    if inference.base_url.is_none() {
        inference.base_url = Some(DEFAULT_OLLAMA_URL.to_string());
    }
    let ollama = OllamaClient::from_config(&inference);
    log::info!(
        "connecting to ollama at {} (model {})",
        ollama.base_url().unwrap_or(DEFAULT_OLLAMA_URL),
        ollama.model()
    );
    {
        let ollama = ollama.clone();
        tokio::spawn(async move { ollama.check_model().await });
    }

    let telegram = Arc::new(TelegramChannel::from_config(token, &config.channels.telegram));
    let handle: Arc<dyn ChannelHandle> = telegram.clone();
    let registry = Arc::new(ChannelRegistry::new().with(handle));
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let dispatcher = spawn_dispatcher(inbound_rx, registry, ollama);
    let poller = telegram.start_inbound(inbound_tx);
    log::info!("telegram bot started (press Ctrl+C to stop)");

    shutdown.await;
    // The in-flight long poll can take up to its full timeout; do not wait for it.
    poller.abort();
    if let Err(e) = poller.await {
        if !e.is_cancelled() {
            log::warn!("telegram poller task failed: {}", e);
        }
    }
    if let Err(e) = dispatcher.await {
        log::warn!("dispatcher task failed: {}", e);
    }
    log::info!("telegram bot stopped");
    Ok(())
}

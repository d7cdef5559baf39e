//! Webhook HTTP server: health, verification handshake, and event delivery.

use crate::channels::{ChannelHandle, ChannelRegistry, InboundMessage, MessengerChannel};
use crate::config::{self, Config};
use crate::gateway::protocol::{PayloadError, Verification, VerifyParams, WebhookPayload};
use crate::llm::OllamaClient;
use crate::relay::{spawn_dispatcher, INBOUND_QUEUE};
use crate::signal::shutdown_signal;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Body of every accepted event delivery.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct GatewayState {
    /// Expected `hub.verify_token`; `None` refuses every handshake.
    pub verify_token: Option<Arc<str>>,
    /// Sender for inbound messages; the dispatcher answers them off the request path.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
}

impl GatewayState {
    pub fn new(verify_token: Option<String>, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            verify_token: verify_token.map(Arc::from),
            inbound_tx,
        }
    }
}

/// Routes: `GET /`, `GET /webhook`, `POST /webhook`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(verify_webhook).post(receive_events))
        .with_state(state)
}

/// Run the webhook server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    serve(listener, config, shutdown_signal()).await
}

/// Serve the webhook routes on an already bound listener until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let messenger = &config.channels.messenger;
    if messenger.verify_token.is_none() {
        log::warn!("no messenger verify token configured; webhook verification will be refused");
    }
    if messenger.page_access_token.is_none() {
        log::warn!("no messenger page access token configured; replies cannot be delivered");
    }

    let ollama = OllamaClient::from_config(&config.inference);
    match ollama.base_url() {
        Some(url) => {
            log::info!("connecting to ollama at {} (model {})", url, ollama.model());
            let ollama = ollama.clone();
            tokio::spawn(async move { ollama.check_model().await });
        }
        None => log::warn!(
            "no ollama url configured (set {}); users will get a configuration error reply",
            config::ENV_OLLAMA_URL
        ),
    }

    let channel: Arc<dyn ChannelHandle> = Arc::new(MessengerChannel::from_config(messenger));
    let registry = Arc::new(ChannelRegistry::new().with(channel));
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let dispatcher = spawn_dispatcher(inbound_rx, registry, ollama);

    let app = router(GatewayState::new(messenger.verify_token.clone(), inbound_tx));
    let local = listener.local_addr().context("reading listener address")?;
    log::info!("webhook server listening on {}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("webhook server exited")?;
    // The router (and with it the last inbound sender) is gone; let queued messages drain.
    if let Err(e) = dispatcher.await {
        log::warn!("dispatcher task failed: {}", e);
    }
    log::info!("webhook server stopped");
    Ok(())
}

/// GET / returns a fixed health JSON (for probes).
async fn health_http() -> Json<serde_json::Value> {
    Json(json!({ "status": "running" }))
}

/// GET /webhook: verification handshake; echoes `hub.challenge` as plain text.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match params.verify(state.verify_token.as_deref()) {
        Verification::Accepted(challenge) => {
            log::info!("webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        Verification::Rejected => {
            log::warn!("webhook verification rejected: token mismatch");
            StatusCode::FORBIDDEN.into_response()
        }
        Verification::Incomplete => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// POST /webhook: queues each text message for a reply and acknowledges at once.
/// Downstream failures never change the 200, so the platform does not redeliver.
async fn receive_events(State(state): State<GatewayState>, body: Bytes) -> Response {
    let inbound = match WebhookPayload::parse_inbound(&body) {
        Ok(inbound) => inbound,
        Err(PayloadError::Malformed) => {
            log::warn!("webhook: rejecting malformed event body");
            return StatusCode::BAD_REQUEST.into_response();
        }
        Err(PayloadError::NotPage) => return StatusCode::NOT_FOUND.into_response(),
    };
    for msg in inbound {
        if state.inbound_tx.send(msg).await.is_err() {
            log::warn!("webhook: dispatcher stopped, dropping message");
            break;
        }
    }
    (StatusCode::OK, EVENT_RECEIVED).into_response()
}


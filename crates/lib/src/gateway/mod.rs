//! Webhook front-end: HTTP server for the page-messaging platform.
//!
//! `GET /` is a liveness probe, `GET /webhook` answers the verification handshake and
//! `POST /webhook` accepts event deliveries. Replies go out through the Send API.

mod protocol;
mod server;

pub use protocol::{PayloadError, Verification, VerifyParams, WebhookPayload};
pub use server::{router, run_gateway, serve, GatewayState, EVENT_RECEIVED};

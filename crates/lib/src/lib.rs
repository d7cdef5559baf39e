//! Relay core library: Ollama client, chat channels, and the two front-ends
//! (Telegram long polling and the page-messaging webhook) used by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod polling;
pub mod relay;
pub mod signal;

//! Ollama client.
//!
//! Non-streaming chat completion against a local Ollama instance, plus the fallback
//! replies used when the server cannot produce one.

mod ollama;

pub use ollama::{
    ChatMessage, ChatResponse, OllamaClient, OllamaError, OllamaModel, ResponseMessage,
    CONFIG_ERROR_REPLY, UNPARSEABLE_REPLY, UNREACHABLE_REPLY,
};

//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.relay/config.json`) and then overlaid with
//! environment variables. The result is immutable for the life of the process and is passed
//! explicitly to the front-ends; nothing reads the environment after startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_OLLAMA_URL: &str = "OLLAMA_PROXY_URL";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL_NAME";
pub const ENV_MESSENGER_VERIFY_TOKEN: &str = "MESSENGER_VERIFY_TOKEN";
pub const ENV_MESSENGER_PAGE_ACCESS_TOKEN: &str = "MESSENGER_PAGE_ACCESS_TOKEN";

/// Base URL used by the polling bot when no inference server is configured.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (Telegram, Messenger).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Inference server (Ollama) settings.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Webhook server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 5000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"; put a tunnel or reverse proxy in front).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
    #[serde(default)]
    pub messenger: MessengerChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN.
    pub bot_token: Option<String>,
    /// Bot API base URL; only changed for tests or self-hosted Bot API servers.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramChannelConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api_base(),
        }
    }
}

/// Messenger (page messaging) channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessengerChannelConfig {
    /// Shared secret echoed by the platform during the webhook verification handshake.
    /// Overridden by MESSENGER_VERIFY_TOKEN. When unset, every handshake is refused.
    pub verify_token: Option<String>,
    /// Page access token for the Send API. Overridden by MESSENGER_PAGE_ACCESS_TOKEN.
    pub page_access_token: Option<String>,
    /// Send API endpoint.
    #[serde(default = "default_messenger_send_url")]
    pub send_url: String,
}

fn default_messenger_send_url() -> String {
    "https://graph.facebook.com/v18.0/me/messages".to_string()
}

impl Default for MessengerChannelConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            page_access_token: None,
            send_url: default_messenger_send_url(),
        }
    }
}

/// Inference server config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Ollama base URL (e.g. "http://localhost:11434"). Overridden by OLLAMA_PROXY_URL.
    pub base_url: Option<String>,
    /// Model name as shown by `ollama list`. Overridden by OLLAMA_MODEL_NAME.
    #[serde(default = "default_model")]
    pub model: String,
    /// Seconds to wait for a complete reply before giving up.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl Config {
    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay values from `lookup` (env var name → value). Empty or whitespace values are
    /// treated as unset, and empty values already in the file are cleared.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).as_deref().and_then(non_empty);
        let file = |v: &Option<String>| v.as_deref().and_then(non_empty);

        self.channels.telegram.bot_token =
            var(ENV_TELEGRAM_BOT_TOKEN).or_else(|| file(&self.channels.telegram.bot_token));
        self.channels.messenger.verify_token = var(ENV_MESSENGER_VERIFY_TOKEN)
            .or_else(|| file(&self.channels.messenger.verify_token));
        self.channels.messenger.page_access_token = var(ENV_MESSENGER_PAGE_ACCESS_TOKEN)
            .or_else(|| file(&self.channels.messenger.page_access_token));
        self.inference.base_url =
            var(ENV_OLLAMA_URL).or_else(|| file(&self.inference.base_url));
        if let Some(model) = var(ENV_OLLAMA_MODEL) {
            self.inference.model = model;
        }
    }

    /// Telegram bot token, required by the polling bot.
    pub fn require_telegram_token(&self) -> Result<&str> {
        match self.channels.telegram.bot_token.as_deref() {
            Some(token) => Ok(token),
            None => anyhow::bail!(
                "telegram bot token is missing (set {} in the environment or .env, or channels.telegram.botToken in the config file)",
                ENV_TELEGRAM_BOT_TOKEN
            ),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or RELAY_CONFIG_PATH / default) and overlay the
/// environment. Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.inference.model, "llama3");
        assert_eq!(config.inference.timeout_secs, 120);
        assert!(config.inference.base_url.is_none());
        assert_eq!(
            config.channels.messenger.send_url,
            "https://graph.facebook.com/v18.0/me/messages"
        );
    }

    #[test]
    fn parses_camel_case_file() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 8080 },
                "channels": { "messenger": { "verifyToken": "s3cret" } },
                "inference": { "baseUrl": "http://10.0.0.2:11434", "model": "qwen3:8b" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.channels.messenger.verify_token.as_deref(), Some("s3cret"));
        assert_eq!(config.inference.base_url.as_deref(), Some("http://10.0.0.2:11434"));
        assert_eq!(config.inference.model, "qwen3:8b");
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::default();
        config.inference.base_url = Some("http://file:11434".to_string());
        config.channels.telegram.bot_token = Some("file-token".to_string());
        config.apply_env_from(lookup(&[
            (ENV_OLLAMA_URL, "http://env:11434"),
            (ENV_TELEGRAM_BOT_TOKEN, " env-token "),
            (ENV_OLLAMA_MODEL, "mistral"),
        ]));
        assert_eq!(config.inference.base_url.as_deref(), Some("http://env:11434"));
        assert_eq!(config.channels.telegram.bot_token.as_deref(), Some("env-token"));
        assert_eq!(config.inference.model, "mistral");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let mut config = Config::default();
        config.channels.messenger.verify_token = Some("   ".to_string());
        config.apply_env_from(lookup(&[(ENV_TELEGRAM_BOT_TOKEN, ""), (ENV_OLLAMA_MODEL, " ")]));
        assert!(config.channels.telegram.bot_token.is_none());
        assert!(config.channels.messenger.verify_token.is_none());
        assert_eq!(config.inference.model, "llama3");
    }

    #[test]
    fn missing_telegram_token_is_an_error() {
        let config = Config::default();
        let err = config.require_telegram_token().unwrap_err();
        assert!(err.to_string().contains(ENV_TELEGRAM_BOT_TOKEN));

        let mut config = Config::default();
        config.channels.telegram.bot_token = Some("123:abc".to_string());
        assert_eq!(config.require_telegram_token().unwrap(), "123:abc");
    }
}

//! Configuration loading and defaults.
//!
//! One TOML file, by default `~/.warelay/config.toml`. A missing file is
//! not an error: the built-in defaults let the relay start and pair, with
//! the webhook URL left at a placeholder until the operator sets it. The
//! `WARELAY_WEBHOOK_URL` environment variable overrides the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Placeholder webhook URL shipped in the default config. Inbound messages
/// are dropped (with a warning) until it is replaced.
pub const WEBHOOK_URL_PLACEHOLDER: &str = "https://your-webhook.example.com/hook";

/// Environment variable overriding `[webhook].url`.
pub const WEBHOOK_URL_ENV: &str = "WARELAY_WEBHOOK_URL";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// HTTP API settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Webhook destination for inbound messages.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// WhatsApp bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Session reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            webhook: WebhookConfig::default(),
            bridge: BridgeConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Webhook destination for inbound message records.
#[derive(Debug, Deserialize)]
pub struct WebhookConfig {
    /// Destination URL. Inbound relaying is disabled while this is the
    /// shipped placeholder.
    #[serde(default = "default_webhook_url")]
    pub url: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
        }
    }
}

/// WhatsApp bridge settings.
#[derive(Debug, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the bridge sidecar.
    #[serde(default = "default_bridge_url")]
    pub base_url: String,

    /// Directory handed to the bridge for session storage. Defaults to
    /// `~/.warelay/session`. Contents are opaque to warelay.
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            session_dir: None,
        }
    }
}

/// Session reconnect policy: capped exponential backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Re-initialization attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first attempt, in milliseconds. Doubled per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on the per-attempt delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

// Default value functions for serde

fn default_bind() -> String {
    "127.0.0.1:3000".to_owned()
}
fn default_webhook_url() -> String {
    WEBHOOK_URL_PLACEHOLDER.to_owned()
}
fn default_bridge_url() -> String {
    "http://127.0.0.1:3001".to_owned()
}
fn default_max_attempts() -> u32 {
    10
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

/// Whether `url` points at a real webhook rather than the shipped
/// placeholder.
pub fn is_webhook_configured(url: &str) -> bool {
    !url.is_empty() && url != WEBHOOK_URL_PLACEHOLDER
}

/// Load configuration from a TOML file.
///
/// A missing file yields the defaults with a warning. The
/// `WARELAY_WEBHOOK_URL` environment variable overrides `[webhook].url`.
/// A configured (non-placeholder) webhook URL must parse as an absolute
/// URL.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// the configured webhook URL is malformed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
        if !url.is_empty() {
            config.webhook.url = url;
        }
    }

    if is_webhook_configured(&config.webhook.url) {
        url::Url::parse(&config.webhook.url)
            .map_err(|e| anyhow::anyhow!("invalid webhook URL {}: {e}", config.webhook.url))?;
    }

    Ok(config)
}

/// Resolve the default config directory (`~/.warelay/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".warelay"))
}

/// Resolve the session directory: the configured value, or
/// `~/.warelay/session`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn session_dir(config: &Config) -> anyhow::Result<PathBuf> {
    match &config.bridge.session_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(config_dir()?.join("session")),
    }
}

// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides sensible defaults for optional ones
use crate::paths;
use anyhow::{Context, Result};
use courier_agent::AgentConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// SQLite database file; defaults to tasks.db in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(paths::expand_tilde(path)),
            None => paths::task_db_file(),
        }
    }
}

// ─── SlackConfig ────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub app_token: String,
    pub bot_token: String,
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// Empty means every channel the bot is in
    #[serde(default)]
    pub allowed_channels: Vec<String>,
}

// Custom Debug impl to redact app_token and bot_token
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("app_token", &"[REDACTED]")
            .field("bot_token", &"[REDACTED]")
            .field("allowed_users", &self.allowed_users)
            .field("allowed_channels", &self.allowed_channels)
            .finish()
    }
}

impl SlackConfig {
    pub fn is_user_allowed(&self, user: &str) -> bool {
        self.allowed_users.iter().any(|u| u == user)
    }

    pub fn is_channel_allowed(&self, channel: &str) -> bool {
        self.allowed_channels.is_empty() || self.allowed_channels.iter().any(|c| c == channel)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive; RUST_LOG takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub json: bool,
    /// Also write daily-rotated log files under the data directory
    #[serde(default)]
    pub file: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address for the Prometheus endpoint, e.g. "127.0.0.1:9464"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
}

impl MetricsConfig {
    pub fn listen_addr(&self) -> Result<Option<SocketAddr>> {
        self.listen
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>().with_context(|| {
                    format!("metrics.listen must be a socket address, got: {}", addr)
                })
            })
            .transpose()
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. COURIER_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/courier/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("COURIER_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!(path = %env_path, "COURIER_CONFIG_PATH does not exist, ignoring");
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from config.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(config_path) => Self::load_from(&config_path),
            None => {
                tracing::info!("No config file found, using environment variables and defaults");
                let mut config = Config::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load an explicit config file, then apply environment overrides
    pub fn load_from(config_path: &Path) -> Result<Self> {
        tracing::info!(
            path = %config_path.display(),
            "Loading configuration from file"
        );
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(content)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("COURIER_AGENT_TYPE") {
            self.agent.agent_type = val;
        }
        if let Ok(val) = std::env::var("COURIER_AGENT_URL") {
            self.agent.url = Some(val);
        }
        if let Ok(val) = std::env::var("COURIER_AGENT_TOKEN") {
            self.agent.auth_token = Some(val);
        }
        if let Ok(val) = std::env::var("COURIER_AGENT_TIMEOUT_SECS") {
            self.agent.timeout_secs = Some(val.parse().with_context(|| {
                format!("COURIER_AGENT_TIMEOUT_SECS must be a valid number, got: {}", val)
            })?);
        }
        if let Ok(val) = std::env::var("COURIER_STORE_PATH") {
            self.store.path = Some(val);
        }
        if let Ok(val) = std::env::var("COURIER_METRICS_LISTEN") {
            self.metrics.listen = Some(val);
        }

        let app_token = std::env::var("SLACK_APP_TOKEN").ok();
        let bot_token = std::env::var("SLACK_BOT_TOKEN").ok();
        if self.slack.is_none() {
            if let (Some(app_token), Some(bot_token)) = (&app_token, &bot_token) {
                self.slack = Some(SlackConfig {
                    app_token: app_token.clone(),
                    bot_token: bot_token.clone(),
                    allowed_users: Vec::new(),
                    allowed_channels: Vec::new(),
                });
            }
        }
        if let Some(ref mut slack) = self.slack {
            if let Some(val) = app_token {
                slack.app_token = val;
            }
            if let Some(val) = bot_token {
                slack.bot_token = val;
            }
            if let Ok(val) = std::env::var("SLACK_ALLOWED_USERS") {
                slack.allowed_users = split_list(&val);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.agent_type == "a2a"
            && self.agent.url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            anyhow::bail!(
                "agent.url is required for a2a agents (set in config.toml or COURIER_AGENT_URL env var)"
            );
        }
        if self.agent.timeout_secs == Some(0) {
            anyhow::bail!("agent.timeout_secs must be greater than zero");
        }

        if let Some(slack) = &self.slack {
            if !slack.app_token.starts_with("xapp-") {
                anyhow::bail!("slack.app_token must be an app-level token (xapp-...)");
            }
            if !slack.bot_token.starts_with("xoxb-") {
                anyhow::bail!("slack.bot_token must be a bot token (xoxb-...)");
            }
        }

        self.metrics.listen_addr()?;
        Ok(())
    }
}

//! Client configuration
//!
//! Resolution order (highest first):
//!   1. command-line flags (applied by the binary through the `with_*` builders)
//!   2. `SOUP_SERVER_URL` / `SOUP_SPEAKER` environment variables
//!   3. `config.toml` (`--config`, `SOUP_CONFIG`, or `<config dir>/soup/config.toml`)
//!   4. built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ClientError, Result};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:42345";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_UI_REFRESH_INTERVAL_MS: u64 = 100;
pub const DEFAULT_SPEAKER: &str = "Anonymous player";

pub const ENV_CONFIG: &str = "SOUP_CONFIG";
pub const ENV_SERVER_URL: &str = "SOUP_SERVER_URL";
pub const ENV_SPEAKER: &str = "SOUP_SPEAKER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the game server; `/cmd` and `/update` are appended
    pub server_url: String,

    /// Delay between the end of one poll and the start of the next
    pub poll_interval_ms: u64,

    /// Delay between UI refreshes in plain mode
    pub ui_refresh_interval_ms: u64,

    /// Name attached to questions and answers
    pub speaker_name: Option<String>,

    /// Name used when `speaker_name` is unset or blank
    pub default_speaker: String,

    /// Refuse to submit input while the server's AI is busy
    pub block_while_agent_busy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ui_refresh_interval_ms: DEFAULT_UI_REFRESH_INTERVAL_MS,
            speaker_name: None,
            default_speaker: DEFAULT_SPEAKER.to_string(),
            block_while_agent_busy: true,
        }
    }
}

impl ClientConfig {
    /// Load the config file (if any) and apply environment overrides.
    ///
    /// An explicitly requested file must exist; the default location is optional.
    pub async fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let (path, required) = match explicit_path {
            Some(path) => (Some(path.to_path_buf()), true),
            None => match env_path {
                Some(path) => (Some(path), true),
                None => (default_config_path(), false),
            },
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path).await?,
            Some(path) if required => {
                return Err(ClientError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.server_url = url;
        }
        if let Some(name) = lookup(ENV_SPEAKER).filter(|v| !v.trim().is_empty()) {
            self.speaker_name = Some(name);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.server_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "server_url must be an http(s) URL, got {:?}",
                self.server_url
            )));
        }
        if self.poll_interval_ms == 0 {
            warn!("poll_interval_ms is 0; the poller will spin as fast as the server answers");
        }
        Ok(())
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn with_speaker_name(mut self, name: impl Into<String>) -> Self {
        self.speaker_name = Some(name.into());
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_block_while_agent_busy(mut self, block: bool) -> Self {
        self.block_while_agent_busy = block;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ui_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.ui_refresh_interval_ms)
    }

    /// The configured speaker name, or the default one when unset or blank
    pub fn effective_speaker(&self) -> &str {
        self.speaker_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.default_speaker.as_str())
    }
}

/// `<config dir>/soup`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("soup"))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

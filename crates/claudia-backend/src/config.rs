//! Client configuration.
//!
//! The controller receives an explicit configuration struct instead of
//! reading ambient environment state. Values resolve in order: built-in
//! defaults, then `~/.config/claudia/config.toml` when present, then
//! environment variable overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use claudia_core::Result;

/// Default backend base URL, matching the development backend.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Configuration for the Claudia client.
#[derive(Debug, Clone)]
pub struct ClaudiaConfig {
    /// Base URL of the backend API, including the `/api` prefix
    pub api_url: String,
    /// Interval between backend status checks
    pub poll_interval: Duration,
    /// Per-request timeout for backend calls
    pub request_timeout: Duration,
    /// Delay before a synthesized demo reply is appended
    pub demo_reply_delay: Duration,
}

impl Default for ClaudiaConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            demo_reply_delay: Duration::from_secs(2),
        }
    }
}

/// Optional fields as they appear in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    poll_interval_secs: Option<u64>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    demo_reply_delay_ms: Option<u64>,
}

impl ClaudiaConfig {
    /// Resolves the effective configuration.
    ///
    /// An unreadable or malformed config file is logged and skipped; the
    /// client must stay usable with defaults alone.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(path) = Self::config_file_path()
            && path.exists()
        {
            match Self::read_file(&path) {
                Ok(file) => config.apply_file(file),
                Err(e) => {
                    tracing::warn!(target: "config", "Ignoring config file {}: {}", path.display(), e);
                }
            }
        }

        config.apply_env();
        config
    }

    /// Parses a config file at an explicit path.
    fn read_file(path: &Path) -> Result<FileConfig> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the path to the config file: ~/.config/claudia/config.toml
    fn config_file_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("claudia").join("config.toml"))
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(api_url) = file.api_url {
            self.api_url = api_url;
        }
        if let Some(secs) = file.poll_interval_secs {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = file.demo_reply_delay_ms {
            self.demo_reply_delay = Duration::from_millis(ms);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(api_url) = std::env::var("CLAUDIA_API_URL") {
            self.api_url = api_url;
        }
        if let Some(secs) = env_u64("CLAUDIA_POLL_INTERVAL_SECS") {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("CLAUDIA_REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_u64("CLAUDIA_DEMO_DELAY_MS") {
            self.demo_reply_delay = Duration::from_millis(ms);
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

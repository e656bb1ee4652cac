//! Application configuration
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. The TOML file (`~/.config/quill/config.toml`, `$QUILL_CONFIG`, or a
//!    path given on the command line)
//! 3. `QUILL_*` environment variables
//!
//! ```toml
//! data_dir = "/home/me/.local/share/quill"
//! remote_url = "https://example.com/entries"
//! sync_enabled = true
//! sync_interval_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const ENV_PREFIX: &str = "QUILL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the entry record lives
    pub data_dir: PathBuf,

    /// Remote collection endpoint
    pub remote_url: Option<String>,

    pub sync_enabled: bool,

    /// Seconds between scheduled reconciliation cycles
    pub sync_interval_secs: u64,

    /// Timeout for a single remote request
    pub request_timeout_secs: u64,

    /// Maximum number of remote records taken from one fetch
    pub fetch_limit: usize,

    /// Category for remote records that carry none
    pub default_category: String,

    /// Log to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quill"),
            remote_url: None,
            sync_enabled: false,
            sync_interval_secs: 30,
            request_timeout_secs: 10,
            fetch_limit: 100,
            default_category: "Remote".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load from the default config file plus environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load, preferring a config file given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load from `path` plus environment, creating the data directory
    ///
    /// A missing file means defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file: {:?}", path))
            }
        };

        config.apply_env_overrides();
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", config.data_dir))?;
        Ok(config)
    }

    /// Parse TOML and apply the environment, without touching the disk
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = env_var("REMOTE_URL") {
            self.remote_url = Some(val).filter(|v| !v.is_empty());
        }
        if let Some(val) = env_var("SYNC_ENABLED") {
            self.sync_enabled = matches!(val.to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(val) = env_var("SYNC_INTERVAL_SECS") {
            match val.parse() {
                Ok(secs) => self.sync_interval_secs = secs,
                Err(_) => warn!("Ignoring {}_SYNC_INTERVAL_SECS={:?}", ENV_PREFIX, val),
            }
        }
    }

    /// Write to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Write to `config_path` as TOML
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))
    }

    /// `$QUILL_CONFIG`, or `config.toml` under the user config directory
    pub fn config_file_path() -> PathBuf {
        env_var("CONFIG").map(PathBuf::from).unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quill")
                .join("config.toml")
        })
    }

    /// The durable entry record
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("entries.json")
    }

    /// Period between scheduled cycles, never below one second
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    /// Timeout for one remote request, never below one second
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Whether a reconciliation cycle can run at all
    pub fn sync_ready(&self) -> bool {
        self.sync_enabled && self.remote_url.is_some()
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

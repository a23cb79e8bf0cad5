//! Configuration loading and management
//!
//! Handles parsing of `tasksync.toml` configuration files.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE: &str = "tasksync.toml";

const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_PER_PAGE: u32 = 1000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task API connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Task listing behaviour
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Task API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API host, without the `/api/v1` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override for the User-Agent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("tasksync/{}", env!("CARGO_PKG_VERSION")))
    }

    fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(Error::InvalidConfig(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "api.base_url must start with http:// or https:// (got '{base}')"
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::InvalidConfig(format!(
                "api.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }
}

/// Task listing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Page size requested when listing; the server default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl TasksConfig {
    fn validate(&self) -> Result<()> {
        match self.per_page {
            Some(n) if n == 0 || n > MAX_PER_PAGE => Err(Error::InvalidConfig(format!(
                "tasks.per_page must be between 1 and {MAX_PER_PAGE}"
            ))),
            _ => Ok(()),
        }
    }
}

impl Config {
    /// Load configuration from a `tasksync.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or the default location, or return defaults.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply command-line / environment overrides, then re-validate.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        token: Option<String>,
    ) -> Result<Self> {
        if let Some(base_url) = base_url {
            self.api.base_url = base_url;
        }
        if let Some(token) = token {
            self.api.token = Some(token);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}

/// Platform config location, e.g. `~/.config/tasksync/tasksync.toml`.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tasksync").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

// Configuration Management Module
// Handles vigil.toml loading, defaults, and validation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use tracing::{info, warn};

/// Main Vigil configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub signals: SignalsConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Used when RUST_LOG is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default = "default_true")]
    pub check_on_start: bool,

    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Defaults to ~/.vigil
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions
fn default_log_format() -> LogFormat { LogFormat::Json }
fn default_filter() -> String { "vigil=info".to_string() }
fn default_repo_owner() -> String { "vigil-rs".to_string() }
fn default_repo_name() -> String { "vigil".to_string() }
fn default_api_base() -> String { "https://api.github.com".to_string() }
fn default_timeout() -> u64 { 10 }
fn default_true() -> bool { true }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            filter: default_filter(),
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_on_start: default_true(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
        }
    }
}

impl VigilConfig {
    /// Load configuration from file or use defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let contents = std::fs::read_to_string(path)
                .context("Failed to read configuration file")?;

            let config: VigilConfig = toml::from_str(&contents)
                .context("Failed to parse configuration file")?;

            config.validate()?;
            Ok(config)
        } else {
            warn!("Configuration file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.logging.filter.trim().is_empty() {
            anyhow::bail!("Log filter cannot be empty");
        }

        if self.update.repo_owner.trim().is_empty() || self.update.repo_name.trim().is_empty() {
            anyhow::bail!("Update repository owner and name are required");
        }

        if !(self.update.api_base.starts_with("http://") || self.update.api_base.starts_with("https://")) {
            anyhow::bail!("Update API base must be an http(s) URL");
        }

        if self.update.timeout_secs == 0 {
            anyhow::bail!("Update timeout must be at least 1 second");
        }

        Ok(())
    }

    /// Location of the preference file
    pub fn preferences_path(&self) -> Result<PathBuf> {
        match &self.preferences.path {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::preferences::default_path()?),
        }
    }
}

//! Global configuration management for selfup.
//!
//! The global configuration file holds user-wide settings: the upgrade
//! defaults and an optional GitHub token for release metadata requests.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.selfup/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\selfup\config.toml`
//! - **Override**: the `SELFUP_CONFIG` environment variable or `--config`
//!
//! # File Format
//!
//! ```toml
//! # Sent as a bearer token to the GitHub API. GITHUB_TOKEN takes precedence.
//! github_token = "ghp_xxxxxxxxxxxx"
//!
//! [upgrade]
//! threads = 4
//! privilege = false
//! install_strategy = "system-copy"
//! ```
//!
//! A missing file is not an error: every setting has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::{CONFIG_PATH_ENV, GITHUB_TOKEN_ENV};
use crate::core::SelfupError;
use crate::upgrade::UpgradeConfig;
use crate::utils::platform::get_home_dir;

/// Global configuration loaded from `~/.selfup/config.toml`.
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::config::GlobalConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = GlobalConfig::load().await?;
/// println!("parallel downloads: {}", config.upgrade.threads);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// GitHub token for release metadata requests.
    ///
    /// Raises the API rate limit. The `GITHUB_TOKEN` environment variable
    /// overrides it; see [`GlobalConfig::github_token`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Upgrade defaults, overridable by command-line flags.
    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load from the default location, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    ///
    /// Returns defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            debug!("No global config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, and
    /// [`SelfupError::ConfigError`] if it is not valid TOML for this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| SelfupError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;
        debug!("Loaded global config from {}", path.display());
        Ok(config)
    }

    /// Default location of the global configuration file.
    ///
    /// `SELFUP_CONFIG` wins when set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("selfup")
        } else {
            get_home_dir()?.join(".selfup")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Token for release metadata requests: `GITHUB_TOKEN` when set and
    /// non-empty, otherwise the configured one.
    pub fn github_token(&self) -> Option<String> {
        std::env::var(GITHUB_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.github_token.clone().filter(|t| !t.trim().is_empty()))
    }
}

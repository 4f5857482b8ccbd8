use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_ELEVATION_HELPER, USER_AGENT,
    default_connect_timeout, default_request_timeout,
};

/// How the extracted binary replaces the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStrategy {
    /// Write a temp file next to the target and rename it into place.
    ///
    /// The installed binary is never observed half-written.
    #[default]
    Rename,
    /// Run the system `cp` tool over the target and forward its exit status.
    ///
    /// A failure midway may leave the installed binary truncated. Falls back
    /// to an in-process stream copy where `cp` is not available.
    SystemCopy,
}

/// Configuration settings for selfup upgrade behavior.
///
/// Lives in the `[upgrade]` table of the global config file. Every field has
/// a default, so an empty or missing table is valid.
///
/// ## TOML Example
/// ```toml
/// [upgrade]
/// show_progress = true
/// privilege = true
/// threads = 4
/// timeout_secs = 600
/// connect_timeout_secs = 30
/// install_strategy = "rename"
/// download_base_url = "https://github.com"
/// api_base_url = "https://api.github.com"
/// elevation_helper = "sudo"
/// count_downloads = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Whether to draw a progress bar while downloading.
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Whether to retry through the elevation helper when the installed
    /// binary is not writable.
    #[serde(default = "default_true")]
    pub privilege: bool,

    /// Number of parallel range requests. Only values above 1 enable the
    /// parallel strategy.
    #[serde(default)]
    pub threads: usize,

    /// Deadline for each HTTP request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP connect timeout, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How the installed binary is replaced.
    #[serde(default)]
    pub install_strategy: InstallStrategy,

    /// Scheme and host serving release archives.
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Release metadata API endpoint.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Program used to re-run the upgrade with elevated privileges.
    #[serde(default = "default_elevation_helper")]
    pub elevation_helper: String,

    /// Whether to fire the best-effort download-count request when a
    /// custom download URL is in use.
    #[serde(default = "default_true")]
    pub count_downloads: bool,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
            privilege: true,
            threads: 0,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            install_strategy: InstallStrategy::default(),
            download_base_url: default_download_base_url(),
            api_base_url: default_api_base_url(),
            elevation_helper: default_elevation_helper(),
            count_downloads: true,
        }
    }
}

impl UpgradeConfig {
    /// Create an `UpgradeConfig` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Build the HTTP client shared by metadata lookups and downloads.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout())
            .connect_timeout(self.connect_timeout())
            .build()
            .context("Failed to build HTTP client")
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    default_request_timeout().as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    default_connect_timeout().as_secs()
}

fn default_download_base_url() -> String {
    DEFAULT_DOWNLOAD_BASE_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_elevation_helper() -> String {
    DEFAULT_ELEVATION_HELPER.to_string()
}

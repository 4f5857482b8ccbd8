//! Global constants used throughout the selfup codebase.
//!
//! This module contains default hosts, version aliases, timeout durations and
//! environment variable names that are used across multiple modules. Defining
//! them centrally keeps magic strings discoverable.

use std::time::Duration;

/// Version alias that selects the development branch instead of a release.
pub const DEV_VERSION_ALIAS: &str = "dev";

/// Version alias that selects the latest published release, same as giving
/// no version at all.
pub const LATEST_VERSION_ALIAS: &str = "latest";

/// Branch name installed when the [`DEV_VERSION_ALIAS`] is requested.
pub const DEV_BRANCH: &str = "master";

/// Prefix carried by development builds (e.g. `dev-1a2b3c`).
pub const DEV_BUILD_PREFIX: &str = "dev-";

/// Default host serving release archives.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://github.com";

/// Default GitHub REST API endpoint for release metadata.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default separator between name, OS and architecture in artifact names.
pub const DEFAULT_PATH_SEPARATOR: &str = "-";

/// Extension of every release archive.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Default privilege-elevation helper looked up in the search path.
pub const DEFAULT_ELEVATION_HELPER: &str = "sudo";

/// Trusted copy tool used by the system-copy install strategy.
pub const SYSTEM_COPY_TOOL: &str = "cp";

/// Default overall deadline for a single HTTP request (10 minutes).
///
/// Large archives on slow links need most of this; a hung connection
/// fails instead of blocking the upgrade forever.
pub fn default_request_timeout() -> Duration {
    Duration::from_secs(600)
}

/// Default TCP connect timeout (30 seconds).
pub fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Number of releases requested per page when scanning for a tag.
pub const RELEASES_PER_PAGE: u32 = 100;

/// User agent sent with every HTTP request. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("selfup/", env!("CARGO_PKG_VERSION"));

/// Environment variable that disables progress bars when set.
pub const NO_PROGRESS_ENV: &str = "SELFUP_NO_PROGRESS";

/// Environment variable overriding the global config file location.
pub const CONFIG_PATH_ENV: &str = "SELFUP_CONFIG";

/// Environment variable holding a GitHub token for release metadata requests.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Name of this program's executable.
pub const BINARY_NAME: &str = "selfup";

/// Organization publishing this program's releases.
pub const RELEASE_ORG: &str = "selfup-dev";

/// Repository publishing this program's releases.
pub const RELEASE_REPO: &str = "selfup";

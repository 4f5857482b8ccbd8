//! selfup - self-upgrade for command-line tools
//!
//! Replaces an installed executable with the one published in a GitHub
//! release archive named `<name><sep><os><sep><arch>.tar.gz`. Written for
//! the `selfup` binary itself, reusable by any tool released the same way.
//!
//! # Architecture Overview
//!
//! One upgrade attempt runs these stages in order, each aborting the attempt
//! on failure:
//!
//! 1. **Locate** the installed binary in the search path
//! 2. **Check** whether it can be written, elevating through `sudo` if not
//! 3. **Resolve** the requested version (`""`, `latest`, `dev` or a tag)
//! 4. **Download** the release archive, optionally in parallel range requests
//! 5. **Extract** the executable from the archive
//! 6. **Install** it over the located binary
//!
//! # Core Modules
//!
//! - [`upgrade`] - The upgrade pipeline and its orchestrator
//! - [`github`] - Release metadata lookups against the GitHub REST API
//! - [`cli`] - The `version` and `version upgrade` commands
//! - [`config`] - Global configuration (`~/.selfup/config.toml`)
//! - [`core`] - Error taxonomy and the output [`Printer`](core::Printer)
//!
//! ## Supporting Modules
//!
//! - [`constants`] - Default hosts, aliases, timeouts and environment names
//! - [`utils`] - Platform names, executable lookup and progress bars
//! - [`version`] - Build information of the running binary
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use selfup_cli::core::ConsolePrinter;
//! use selfup_cli::github::GitHubReleaseClient;
//! use selfup_cli::upgrade::{SelfUpdater, UpgradeOptions, UpgradeTarget};
//! use selfup_cli::version::BuildInfo;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let target = UpgradeTarget::new("jenkins-zh", "jenkins-cli", "jcli");
//! let source = GitHubReleaseClient::new(reqwest::Client::new());
//! let printer = Arc::new(ConsolePrinter::new(false));
//!
//! SelfUpdater::new(target, BuildInfo::current(), source, printer)
//!     .upgrade("latest", &UpgradeOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod github;
pub mod upgrade;
pub mod utils;
pub mod version;

// test_utils is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

//! Command-line interface for selfup.
//!
//! The CLI exposes the self-upgrade subsystem the way a host tool would:
//! under a `version` command.
//!
//! # Available Commands
//!
//! - `version` (alias `ver`) - Print version, last commit, build date and
//!   project URL; optionally the changelog or the latest published version
//! - `version upgrade [VERSION]` - Replace the installed binary with a
//!   published release (or the development branch with `dev`)
//!
//! # Command Usage Patterns
//!
//! ```bash
//! # What is installed, and what is the latest release?
//! selfup version --show-latest
//!
//! # Upgrade, splitting the download into four range requests
//! selfup version upgrade --thread 4
//!
//! # Automation: no progress bars, errors only
//! selfup --quiet --no-progress version upgrade v0.4.0
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only, no status lines
//! - `--no-progress` - Never draw progress bars
//! - `--config <PATH>` - Use another global configuration file
//!
//! # Exit Codes
//!
//! `0` on success, `1` on any error. When an upgrade is handed to the
//! elevation helper, the child's exit code is forwarded unchanged.

pub mod upgrade;
pub mod version;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::constants::{BINARY_NAME, CONFIG_PATH_ENV, NO_PROGRESS_ENV, RELEASE_ORG, RELEASE_REPO};
use crate::core::{ConsolePrinter, Printer};
use crate::github::GitHubReleaseClient;
use crate::upgrade::UpgradeTarget;
use crate::version::BuildInfo;

use self::version::VersionCommand;

/// Runtime configuration derived from the global command-line flags.
///
/// Separates flag parsing from execution so tests can inject settings
/// without going through argument parsing.
///
/// # Usage Pattern
///
/// ```rust,ignore
/// let mut config = CliConfig::new();
/// config.no_progress = true;
/// config.apply_to_env();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter for the tracing subscriber.
    ///
    /// When `None`, `RUST_LOG` decides, falling back to `warn`.
    pub log_level: Option<String>,

    /// Whether status lines are suppressed.
    pub quiet: bool,

    /// Whether to disable progress bars.
    ///
    /// When `true`, sets `SELFUP_NO_PROGRESS` for this process. An elevated
    /// re-run gets `--no-progress` through [`forwarded_args`](Self::forwarded_args).
    pub no_progress: bool,

    /// Custom path to the global configuration file.
    ///
    /// When specified, sets `SELFUP_CONFIG` for this process. An elevated
    /// re-run gets `--config` through [`forwarded_args`](Self::forwarded_args).
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this configuration to the process environment.
    ///
    /// # Environment Variables Set
    ///
    /// - `SELFUP_NO_PROGRESS`: set to "1" if `no_progress` is true
    /// - `SELFUP_CONFIG`: set to `config_path` if specified
    ///
    /// # Thread Safety
    ///
    /// Modifies global environment state. Call it once, before any command
    /// work starts.
    pub fn apply_to_env(&self) {
        if self.no_progress {
            // SAFETY: called once at startup, before command execution spawns work
            unsafe { std::env::set_var(NO_PROGRESS_ENV, "1") };
        }

        if let Some(ref path) = self.config_path {
            // SAFETY: as above
            unsafe { std::env::set_var(CONFIG_PATH_ENV, path) };
        }
    }

    /// Global flags for an upgrade re-run through the elevation helper.
    ///
    /// `sudo` resets the environment and `HOME`, so the settings applied by
    /// [`apply_to_env`](Self::apply_to_env) do not reach the child. They are
    /// passed as arguments instead. `config_file` is the configuration file
    /// this process loaded, if any.
    #[must_use]
    pub fn forwarded_args(&self, config_file: Option<&Path>) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(path) = config_file {
            args.push(OsString::from("--config"));
            args.push(path.as_os_str().to_os_string());
        }
        if self.quiet {
            args.push(OsString::from("--quiet"));
        }
        if self.no_progress {
            args.push(OsString::from("--no-progress"));
        }
        args
    }
}

/// Main CLI structure for selfup.
#[derive(Parser, Debug)]
#[command(
    name = "selfup",
    about = "Self-upgrade for CLIs published as GitHub release archives",
    version,
    long_about = "selfup replaces an installed executable with the one published in a GitHub \
                  release archive, downloading in parallel range requests when asked to."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars.
    ///
    /// Also applies to an upgrade re-run through the elevation helper.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Path to a custom global configuration file.
    ///
    /// Overrides `~/.selfup/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version of selfup
    #[command(visible_alias = "ver")]
    Version(VersionCommand),
}

impl Cli {
    /// Execute the parsed command; returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns the command's failure with context for
    /// [`user_friendly_error`](crate::core::user_friendly_error).
    pub async fn execute(self) -> Result<i32> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed flags.
    ///
    /// - `--verbose` logs at `debug`
    /// - `--quiet` logs errors only and suppresses status lines
    /// - otherwise `RUST_LOG` applies
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    ///
    /// Loads the global configuration file, then dispatches to the command
    /// with the real release service and a console printer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the
    /// command fails.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<i32> {
        config.apply_to_env();

        let config_file = match config.config_path.clone() {
            Some(path) => Some(path),
            None => GlobalConfig::default_path().ok(),
        }
        .filter(|path| path.exists())
        .map(|path| std::path::absolute(&path).unwrap_or(path));
        let forwarded = config.forwarded_args(config_file.as_deref());

        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;
        let printer: Arc<dyn Printer> = Arc::new(ConsolePrinter::new(config.quiet));
        let source = GitHubReleaseClient::new(global.upgrade.http_client()?)
            .with_api_base_url(global.upgrade.api_base_url.clone())
            .with_token(global.github_token());
        let target = release_target(&global);
        let build = BuildInfo::current();

        match self.command {
            Commands::Version(cmd) => {
                cmd.execute(&target, &build, &global, source, printer, &forwarded).await
            }
        }
    }
}

/// The upgrade target describing this program's own releases.
pub fn release_target(config: &GlobalConfig) -> UpgradeTarget {
    UpgradeTarget::new(RELEASE_ORG, RELEASE_REPO, BINARY_NAME)
        .with_download_base_url(config.upgrade.download_base_url.clone())
}

use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;
use std::sync::Arc;
use tracing::debug;

use crate::config::GlobalConfig;
use crate::core::Printer;
use crate::github::ReleaseSource;
use crate::upgrade::{SelfUpdater, UpgradeConfig, UpgradeOptions, UpgradeOutcome, UpgradeTarget};
use crate::version::BuildInfo;

/// Command-line arguments for `version upgrade`.
///
/// Every flag is optional; an omitted flag takes its value from the
/// `[upgrade]` table of the global configuration.
///
/// # Examples
///
/// ```bash
/// # Upgrade to the latest release
/// selfup version upgrade
///
/// # Upgrade to a specific release with four parallel range requests
/// selfup version upgrade v0.4.0 --thread 4
///
/// # Build from the development branch, never asking for elevation
/// selfup version upgrade dev --privilege=false
///
/// # No progress bar
/// selfup version upgrade --show-progress=false
/// ```
///
/// # Privilege Elevation
///
/// When the installed binary is not writable and `--privilege` is on (the
/// default), the upgrade is re-run through the elevation helper (`sudo` by
/// default) as `<helper> <binary> version upgrade --privilege=false ... <tag>`.
/// The exit code of that child becomes the exit code of this command.
#[derive(Parser, Debug, Default)]
pub struct UpgradeArgs {
    /// Version to upgrade to.
    ///
    /// Empty or `latest` selects the latest release, `dev` selects the
    /// development branch, anything else is used verbatim as a release tag.
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Whether to show the progress bar while downloading.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub show_progress: Option<bool>,

    /// Whether to retry with elevated privileges when the binary is not writable.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub privilege: Option<bool>,

    /// Number of parallel range requests; values above 1 split the download.
    #[arg(short = 't', long, value_name = "N")]
    pub thread: Option<usize>,
}

impl UpgradeArgs {
    /// Merge the flags over the configured defaults.
    pub fn options(&self, config: &UpgradeConfig) -> UpgradeOptions {
        let defaults = UpgradeOptions::from_config(config);
        UpgradeOptions {
            show_progress: self.show_progress.unwrap_or(defaults.show_progress),
            privilege: self.privilege.unwrap_or(defaults.privilege),
            threads: self.thread.unwrap_or(defaults.threads),
        }
    }

    /// The version argument, empty when none was given.
    pub fn requested_version(&self) -> &str {
        self.version.as_deref().unwrap_or_default()
    }

    /// Run the upgrade; returns the process exit code.
    ///
    /// A successful upgrade and an up-to-date binary both exit with `0`. An
    /// elevated upgrade exits with the child's code. `forwarded` holds the
    /// global flags the elevated re-run is given.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage of the upgrade.
    pub async fn execute<S: ReleaseSource>(
        self,
        target: &UpgradeTarget,
        build: &BuildInfo,
        config: &GlobalConfig,
        source: S,
        printer: Arc<dyn Printer>,
        forwarded: &[OsString],
    ) -> Result<i32> {
        let options = self.options(&config.upgrade);
        debug!("Upgrade options: {:?}", options);

        let updater = SelfUpdater::new(target.clone(), build.clone(), source, printer.clone())
            .with_config(config.upgrade.clone())
            .with_elevation_args(forwarded.iter().cloned());
        match updater.upgrade(self.requested_version(), &options).await? {
            UpgradeOutcome::Upgraded {
                tag,
                path,
            } => {
                printer.printf(format_args!(
                    "{} upgraded to {tag} at {}",
                    target.name(),
                    path.display()
                ));
                Ok(0)
            }
            UpgradeOutcome::UpToDate {
                ..
            } => Ok(0),
            UpgradeOutcome::Elevated {
                exit_code,
            } => {
                debug!("Elevated upgrade exited with {}", exit_code);
                Ok(exit_code)
            }
        }
    }
}

//! Print build information and release notes.
//!
//! # Examples
//!
//! ```bash
//! # Version, commit, build date and project URL
//! selfup version
//!
//! # Release notes of the running version
//! selfup version --changelog
//!
//! # Latest published version and its release notes
//! selfup ver -s -c
//!
//! # Upgrade to the latest release
//! selfup version upgrade
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::ffi::OsString;
use std::sync::Arc;
use tracing::debug;

use super::upgrade::UpgradeArgs;
use crate::config::GlobalConfig;
use crate::core::{Printer, SelfupError};
use crate::github::ReleaseSource;
use crate::upgrade::UpgradeTarget;
use crate::version::BuildInfo;

/// Print the version of selfup.
#[derive(Args, Debug)]
pub struct VersionCommand {
    /// Output the changelog
    #[arg(short = 'c', long)]
    pub changelog: bool,

    /// Output the latest version
    #[arg(short = 's', long)]
    pub show_latest: bool,

    #[command(subcommand)]
    pub command: Option<VersionSubcommand>,
}

/// Subcommands of `version`.
#[derive(Subcommand, Debug)]
pub enum VersionSubcommand {
    /// Upgrade selfup itself
    #[command(long_about = "Upgrade selfup itself.\n\n\
        You can use any existing version to upgrade selfup itself. If there's no argument \
        given, it will upgrade to the latest release.\n\n\
        To upgrade to the latest development version, use: selfup version upgrade dev")]
    Upgrade(UpgradeArgs),
}

impl VersionCommand {
    /// Run the command; returns the process exit code.
    ///
    /// `forwarded` holds the global flags an elevated upgrade is re-run with.
    pub async fn execute<S: ReleaseSource>(
        self,
        target: &UpgradeTarget,
        build: &BuildInfo,
        config: &GlobalConfig,
        source: S,
        printer: Arc<dyn Printer>,
        forwarded: &[OsString],
    ) -> Result<i32> {
        match self.command {
            Some(VersionSubcommand::Upgrade(args)) => {
                args.execute(target, build, config, source, printer, forwarded).await
            }
            None => {
                self.print(target, build, &source, printer.as_ref()).await?;
                Ok(0)
            }
        }
    }

    /// Print build information, and release notes when requested.
    ///
    /// # Errors
    ///
    /// Returns an error when a requested release lookup fails, and
    /// [`SelfupError::ReleaseNotFound`] when the running version has no
    /// published release to take the changelog from.
    pub async fn print<S: ReleaseSource>(
        &self,
        target: &UpgradeTarget,
        build: &BuildInfo,
        source: &S,
        printer: &dyn Printer,
    ) -> Result<()> {
        printer.printf(format_args!("Version: {}", build.version()));
        printer.printf(format_args!("Last Commit: {}", build.commit()));
        printer.printf(format_args!("Build Date: {}", build.date()));
        printer.println(&target.project_url());

        if self.changelog && !self.show_latest {
            let tag = build.release_version();
            let release = source
                .release_by_tag(target.org(), target.repo(), tag)
                .await
                .with_context(|| format!("Cannot get the changelog of {tag}"))?;
            let release = release.ok_or_else(|| SelfupError::ReleaseNotFound {
                tag: tag.to_string(),
            })?;
            debug!("Found release {} of {}/{}", tag, target.org(), target.repo());
            printer.println("Changelog:");
            printer.println(&release.body);
        }

        if self.show_latest {
            let latest = source
                .latest_release(target.org(), target.repo())
                .await
                .context("Cannot get the latest version")?;
            printer.printf(format_args!("The latest version {}", latest.tag_name));
            if self.changelog {
                printer.println("Changelog:");
                printer.println(&latest.body);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::ReleaseAsset;
    use crate::test_utils::{RecordingPrinter, StaticReleaseSource};

    fn command(changelog: bool, show_latest: bool) -> VersionCommand {
        VersionCommand {
            changelog,
            show_latest,
            command: None,
        }
    }

    fn build() -> BuildInfo {
        BuildInfo::new("jcli", "dev-v0.0.29", "abc1234", "2024-02-03")
    }

    fn target() -> UpgradeTarget {
        UpgradeTarget::new("jenkins-zh", "jenkins-cli", "jcli")
    }

    #[tokio::test]
    async fn test_prints_build_info_without_lookups() {
        let printer = RecordingPrinter::new();
        let source = StaticReleaseSource::unreachable();

        command(false, false).print(&target(), &build(), &source, &printer).await.unwrap();

        assert_eq!(
            printer.lines(),
            vec![
                "Version: dev-v0.0.29",
                "Last Commit: abc1234",
                "Build Date: 2024-02-03",
                "https://github.com/jenkins-zh/jenkins-cli",
            ]
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_changelog_of_current_version_strips_dev_prefix() {
        let printer = RecordingPrinter::new();
        let source = StaticReleaseSource::with_releases(vec![
            ReleaseAsset::new("v0.0.30", "- newest"),
            ReleaseAsset::new("v0.0.29", "- fix upgrade"),
        ]);

        command(true, false).print(&target(), &build(), &source, &printer).await.unwrap();

        let lines = printer.lines();
        assert_eq!(&lines[4..], ["Changelog:", "- fix upgrade"]);
    }

    #[tokio::test]
    async fn test_changelog_of_unpublished_version() {
        let printer = RecordingPrinter::new();
        let source = StaticReleaseSource::with_latest("v0.0.30");

        let err =
            command(true, false).print(&target(), &build(), &source, &printer).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SelfupError>(),
            Some(SelfupError::ReleaseNotFound { tag }) if tag == "v0.0.29"
        ));
        assert_eq!(printer.lines().len(), 4);
    }

    #[tokio::test]
    async fn test_show_latest_with_changelog() {
        let printer = RecordingPrinter::new();
        let source = StaticReleaseSource::with_latest("v0.0.30");

        command(true, true).print(&target(), &build(), &source, &printer).await.unwrap();

        let lines = printer.lines();
        assert_eq!(&lines[4..], ["The latest version v0.0.30", "Changelog:", "notes for v0.0.30"]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_reported() {
        let printer = RecordingPrinter::new();
        let source = StaticReleaseSource::unreachable();

        let err =
            command(false, true).print(&target(), &build(), &source, &printer).await.unwrap_err();
        assert!(format!("{err:#}").contains("Cannot get the latest version"));
    }
}

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::UpgradeConfig;
use super::extractor::extract_payload_async;
use super::fetcher::{ArchiveFetcher, DownloadJob, spawn_download_count};
use super::installer::{BinaryInstaller, ElevationCommand, WriteAccess};
use super::resolver::ReleaseResolver;
use super::target::UpgradeTarget;
use crate::core::{Printer, SelfupError};
use crate::github::ReleaseSource;
use crate::version::BuildInfo;

/// Per-invocation switches, usually taken from command-line flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Draw a progress bar while downloading
    pub show_progress: bool,
    /// Retry through the elevation helper when the binary is not writable
    pub privilege: bool,
    /// Parallel range requests; only values above 1 split the download
    pub threads: usize,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self::from_config(&UpgradeConfig::default())
    }
}

impl UpgradeOptions {
    /// Options matching the defaults in `config`.
    pub fn from_config(config: &UpgradeConfig) -> Self {
        Self {
            show_progress: config.show_progress,
            privilege: config.privilege,
            threads: config.threads,
        }
    }
}

/// How an upgrade attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The requested version is already running; nothing was downloaded.
    UpToDate {
        /// The resolved tag
        tag: String,
    },
    /// The installed binary was replaced.
    Upgraded {
        /// The installed tag
        tag: String,
        /// The replaced binary
        path: PathBuf,
    },
    /// The upgrade was handed to an elevated child process.
    Elevated {
        /// Exit code of the child, to be forwarded by the caller
        exit_code: i32,
    },
}

/// Upgrade orchestrator.
///
/// Sequences locate, write check, resolution, download, extraction and
/// install for one [`UpgradeTarget`]. Every stage error aborts the attempt.
/// All temporary files live in a per-attempt directory removed on every
/// exit path, and the installed binary is only touched by the final
/// install step.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use selfup_cli::core::ConsolePrinter;
/// use selfup_cli::github::GitHubReleaseClient;
/// use selfup_cli::upgrade::{SelfUpdater, UpgradeOptions, UpgradeOutcome, UpgradeTarget};
/// use selfup_cli::version::BuildInfo;
///
/// # async fn example() -> anyhow::Result<()> {
/// let target = UpgradeTarget::new("jenkins-zh", "jenkins-cli", "jcli");
/// let source = GitHubReleaseClient::new(reqwest::Client::new());
/// let updater = SelfUpdater::new(target, BuildInfo::current(), source, Arc::new(ConsolePrinter::new(false)));
///
/// match updater.upgrade("", &UpgradeOptions::default()).await? {
///     UpgradeOutcome::Upgraded { tag, path } => println!("{} is now {tag}", path.display()),
///     UpgradeOutcome::UpToDate { .. } => {}
///     UpgradeOutcome::Elevated { exit_code } => std::process::exit(exit_code),
/// }
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater<S: ReleaseSource> {
    target: UpgradeTarget,
    build: BuildInfo,
    source: S,
    printer: Arc<dyn Printer>,
    config: UpgradeConfig,
    search_path: Option<OsString>,
    elevation_args: Vec<OsString>,
}

impl<S: ReleaseSource> SelfUpdater<S> {
    /// Create an updater with default configuration.
    pub fn new(
        target: UpgradeTarget,
        build: BuildInfo,
        source: S,
        printer: Arc<dyn Printer>,
    ) -> Self {
        Self {
            target,
            build,
            source,
            printer,
            config: UpgradeConfig::default(),
            search_path: None,
            elevation_args: Vec::new(),
        }
    }

    /// Use `config` for timeouts, install strategy, elevation and counting.
    pub fn with_config(mut self, config: UpgradeConfig) -> Self {
        self.config = config;
        self
    }

    /// Locate the installed binary in `paths` instead of the process `PATH`.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Global flags for the elevated re-invocation, placed before the
    /// command path (e.g. `--config <path>`).
    pub fn with_elevation_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.elevation_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The running build.
    pub fn build_info(&self) -> &BuildInfo {
        &self.build
    }

    /// The upgrade target.
    pub fn target(&self) -> &UpgradeTarget {
        &self.target
    }

    fn installer(&self) -> BinaryInstaller {
        let installer =
            BinaryInstaller::new(self.target.name()).with_strategy(self.config.install_strategy);
        match &self.search_path {
            Some(paths) => installer.with_search_path(paths.clone()),
            None => installer,
        }
    }

    /// Upgrade to `requested` (`""` or `latest` for the latest release,
    /// `dev` for the development branch, otherwise a tag).
    ///
    /// # Errors
    ///
    /// Any stage failure, as a [`SelfupError`] of the matching kind with
    /// context naming the path or URL involved. When the binary is not
    /// writable and `options.privilege` is off, fails with
    /// [`SelfupError::PermissionDenied`] before any network request.
    pub async fn upgrade(
        &self,
        requested: &str,
        options: &UpgradeOptions,
    ) -> Result<UpgradeOutcome> {
        let name = self.target.name();
        let installer = self.installer();

        let binary = installer.locate()?;
        let access = installer.check_writable(&binary);
        if access == WriteAccess::Denied && !options.privilege {
            return Err(SelfupError::PermissionDenied {
                operation: "open for write".to_string(),
                path: binary.display().to_string(),
            }
            .into());
        }

        let resolver = ReleaseResolver::new(&self.source, self.target.org(), self.target.repo());
        let resolution = resolver.resolve(requested, self.build.version()).await?;
        let tag = resolution.tag;
        if !resolution.needs_upgrade {
            self.printer.printf(format_args!("no need to upgrade {name}"));
            return Ok(UpgradeOutcome::UpToDate {
                tag,
            });
        }

        if access == WriteAccess::Denied {
            let command = ElevationCommand::new(
                &self.config.elevation_helper,
                &binary,
                self.target.command_path(),
                &tag,
                options.show_progress,
                options.threads,
            )?
            .with_global_args(self.elevation_args.iter().cloned());
            let exit_code = command.run().await?;
            return Ok(UpgradeOutcome::Elevated {
                exit_code,
            });
        }

        self.printer.println(&format!("prepare to upgrade to {tag}"));

        let client = self.config.http_client()?;
        let url = self.target.download_url(&tag);
        if self.target.has_custom_download_url() && self.config.count_downloads {
            let count_url = self.target.default_download_url(&tag);
            debug!("Counting download through {}", count_url);
            drop(spawn_download_count(client.clone(), count_url));
        }
        self.printer.println(&format!("start to download from {url}"));

        let workdir = tempfile::Builder::new()
            .prefix("selfup-upgrade-")
            .tempdir()
            .context("Failed to create temporary directory for the upgrade")?;
        let archive = workdir.path().join(format!("{name}.tar.gz"));

        let job = DownloadJob::new(url.clone(), archive.clone())
            .with_threads(options.threads)
            .with_progress(options.show_progress);
        ArchiveFetcher::new(client)
            .fetch(&job)
            .await
            .with_context(|| format!("Cannot download {name} from {url}"))?;

        let payload = extract_payload_async(archive.clone(), name.to_string())
            .await?
            .ok_or_else(|| SelfupError::PayloadNotFound {
                name: name.to_string(),
                archive: archive.display().to_string(),
            })?;

        installer.install(&payload, &binary).await?;
        info!("Upgraded {} at {} to {}", name, binary.display(), tag);

        Ok(UpgradeOutcome::Upgraded {
            tag,
            path: binary,
        })
    }
}

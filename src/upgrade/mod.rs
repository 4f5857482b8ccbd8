//! Self-upgrade of an installed executable.
//!
//! This module replaces a binary found in the search path with the one
//! published in a GitHub release archive. It is written for selfup itself
//! but works for any executable released as
//! `<name><sep><os><sep><arch>.tar.gz`.
//!
//! # Architecture Overview
//!
//! - **[`UpgradeTarget`]**: what is upgraded and where its archives are published
//! - **[`resolver::ReleaseResolver`]**: turns `""`, `latest`, `dev` or a tag into the tag to install
//! - **[`fetcher::ArchiveFetcher`]**: single-stream or parallel range download
//! - **[`extractor`]**: pulls the executable out of the `.tar.gz`
//! - **[`installer::BinaryInstaller`]**: locate, write check, elevation and replacement
//! - **[`SelfUpdater`]**: the orchestrator sequencing all of the above
//! - **[`config::UpgradeConfig`]**: the `[upgrade]` table of the global config
//!
//! ## Upgrade Flow
//!
//! ```text
//! 1. Locate
//!    └── Find <name> in the search path (symlinks resolved)
//!
//! 2. Write check
//!    ├── Writable          → continue
//!    ├── Denied, no priv.  → PermissionDenied, nothing downloaded
//!    └── Denied, priv.     → continue, elevate after resolution
//!
//! 3. Resolve
//!    ├── "dev"             → master
//!    ├── "" / "latest"     → latest release tag
//!    ├── tag == current    → "no need to upgrade", stop
//!    └── Denied            → run `sudo <binary> version upgrade --privilege=false ... <tag>`
//!
//! 4. Download into a per-attempt temp dir
//!    ├── threads > 1 and range support → N concurrent range requests
//!    └── otherwise                     → single stream
//!
//! 5. Extract the first regular file named <name>; none is PayloadNotFound
//!
//! 6. Install
//!    ├── rename (default): temp file in the target dir renamed over it
//!    └── system-copy: `cp <payload> <target>`
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use selfup_cli::core::ConsolePrinter;
//! use selfup_cli::github::GitHubReleaseClient;
//! use selfup_cli::upgrade::{SelfUpdater, UpgradeConfig, UpgradeOptions, UpgradeTarget};
//! use selfup_cli::version::BuildInfo;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpgradeConfig::default();
//! let source = GitHubReleaseClient::new(config.http_client()?);
//! let target = UpgradeTarget::new("jenkins-zh", "jenkins-cli", "jcli").with_path_separator("-");
//!
//! let updater = SelfUpdater::new(target, BuildInfo::current(), source, Arc::new(ConsolePrinter::new(false)))
//!     .with_config(config.clone());
//! updater.upgrade("dev", &UpgradeOptions::from_config(&config)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Semantics
//!
//! Every stage error aborts the attempt; nothing is retried. The installed
//! binary is only written by the final install step, so a failed download or
//! a bad archive leaves it untouched. The download-count request fired for
//! custom download URLs is the one exception: it runs detached and its
//! result is discarded.

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod installer;
pub mod resolver;
pub mod self_updater;
pub mod target;

pub use config::{InstallStrategy, UpgradeConfig};
pub use self_updater::{SelfUpdater, UpgradeOptions, UpgradeOutcome};
pub use target::UpgradeTarget;

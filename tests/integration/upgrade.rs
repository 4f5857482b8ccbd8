//! End-to-end upgrades with the GitHub release client against a local server.

use anyhow::Result;
use selfup_cli::core::{ErrorKind, SelfupError};
use selfup_cli::github::GitHubReleaseClient;
use selfup_cli::test_utils::{RecordingPrinter, TarGzBuilder};
use selfup_cli::upgrade::{
    InstallStrategy, SelfUpdater, UpgradeConfig, UpgradeOptions, UpgradeOutcome,
};
use selfup_cli::version::BuildInfo;
use std::sync::Arc;

use crate::common::Installation;

fn updater(
    install: &Installation,
    version: &str,
    printer: Arc<RecordingPrinter>,
) -> SelfUpdater<GitHubReleaseClient> {
    let source = GitHubReleaseClient::new(reqwest::Client::new())
        .with_api_base_url(install.server.base_url());
    let build = BuildInfo::new(install.name, version, "abc1234", "2024-01-01");
    SelfUpdater::new(install.target(), build, source, printer)
        .with_search_path(install.bin_dir.as_os_str())
}

fn options(threads: usize) -> UpgradeOptions {
    UpgradeOptions {
        show_progress: false,
        privilege: false,
        threads,
    }
}

fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|e| e.downcast_ref::<SelfupError>()).map(SelfupError::kind)
}

#[tokio::test]
async fn test_upgrade_to_latest_release() -> Result<()> {
    let install = Installation::new("selfup", b"selfup v1.0.0").await?;
    install.publish_latest("v1.2.0", b"selfup v1.2.0");
    let printer = Arc::new(RecordingPrinter::new());

    let outcome = updater(&install, "v1.0.0", printer.clone()).upgrade("", &options(0)).await?;

    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            tag: "v1.2.0".to_string(),
            path: install.binary.canonicalize()?,
        }
    );
    assert_eq!(install.installed(), b"selfup v1.2.0");
    assert_eq!(
        printer.lines(),
        vec![
            "prepare to upgrade to v1.2.0".to_string(),
            format!("start to download from {}", install.target().download_url("v1.2.0")),
        ]
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&install.binary)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }
    Ok(())
}

#[tokio::test]
async fn test_latest_alias_matches_empty_version() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    install.publish_latest("v2.0.0", b"new");
    let printer = Arc::new(RecordingPrinter::new());

    let outcome =
        updater(&install, "v1.0.0", printer).upgrade("latest", &options(0)).await?;

    assert!(matches!(outcome, UpgradeOutcome::Upgraded { ref tag, .. } if tag == "v2.0.0"));
    assert_eq!(install.installed(), b"new");
    Ok(())
}

#[tokio::test]
async fn test_already_on_latest_release() -> Result<()> {
    let install = Installation::new("selfup", b"selfup v1.2.0").await?;
    install.publish_latest("v1.2.0", b"should not be installed");
    let printer = Arc::new(RecordingPrinter::new());

    let outcome = updater(&install, "v1.2.0", printer.clone()).upgrade("", &options(0)).await?;

    assert_eq!(
        outcome,
        UpgradeOutcome::UpToDate {
            tag: "v1.2.0".to_string(),
        }
    );
    assert_eq!(printer.lines(), vec!["no need to upgrade selfup"]);
    assert_eq!(install.installed(), b"selfup v1.2.0");
    assert_eq!(install.server.hits(&install.artifact_path("v1.2.0")), 0);
    Ok(())
}

#[tokio::test]
async fn test_explicit_tag_skips_metadata_and_downloads_in_parallel() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    install.publish("v1.3.0", &payload);
    let printer = Arc::new(RecordingPrinter::new());

    updater(&install, "v1.0.0", printer).upgrade("v1.3.0", &options(4)).await?;

    assert_eq!(install.installed(), payload);
    let requests = install.server.requests();
    assert!(requests.iter().all(|r| !r.path.starts_with("/repos/")));
    assert_eq!(requests.iter().filter(|r| r.range.is_some()).count(), 4);
    Ok(())
}

#[tokio::test]
async fn test_dev_installs_development_branch() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    install.publish("master", b"nightly");
    let printer = Arc::new(RecordingPrinter::new());

    let outcome = updater(&install, "dev-abc1234", printer).upgrade("dev", &options(0)).await?;

    assert!(matches!(outcome, UpgradeOutcome::Upgraded { ref tag, .. } if tag == "master"));
    assert_eq!(install.installed(), b"nightly");
    Ok(())
}

#[tokio::test]
async fn test_archive_without_executable_keeps_binary() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    let archive = TarGzBuilder::new().file("other-tool", b"not it", 0o755).build();
    install.server.serve(&install.artifact_path("v1.1.0"), archive);
    let printer = Arc::new(RecordingPrinter::new());

    let err =
        updater(&install, "v1.0.0", printer).upgrade("v1.1.0", &options(0)).await.unwrap_err();

    assert_eq!(error_kind(&err), Some(ErrorKind::Extraction));
    assert!(format!("{err:#}").contains("does not contain 'selfup'"));
    assert_eq!(install.installed(), b"old");
    Ok(())
}

#[tokio::test]
async fn test_unpublished_release_keeps_binary() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    let printer = Arc::new(RecordingPrinter::new());

    let err =
        updater(&install, "v1.0.0", printer).upgrade("v9.9.9", &options(2)).await.unwrap_err();

    assert_eq!(error_kind(&err), Some(ErrorKind::Download));
    assert_eq!(install.installed(), b"old");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_metadata_is_resolution_error() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    let printer = Arc::new(RecordingPrinter::new());

    let err = updater(&install, "v1.0.0", printer.clone())
        .upgrade("", &options(0))
        .await
        .unwrap_err();

    assert_eq!(error_kind(&err), Some(ErrorKind::Resolution));
    assert!(format!("{err:#}").contains("selfup-dev/selfup"));
    assert!(printer.lines().is_empty());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_system_copy_strategy() -> Result<()> {
    let install = Installation::new("selfup", b"old").await?;
    install.publish("v1.4.0", b"copied by cp");
    let printer = Arc::new(RecordingPrinter::new());
    let config = UpgradeConfig {
        install_strategy: InstallStrategy::SystemCopy,
        ..UpgradeConfig::default()
    };

    updater(&install, "v1.0.0", printer)
        .with_config(config)
        .upgrade("v1.4.0", &options(0))
        .await?;

    assert_eq!(install.installed(), b"copied by cp");
    Ok(())
}

//! The `selfup` binary driven through `assert_cmd`.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::common::Installation;

const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// `selfup` with an isolated environment and a config file that may not exist.
fn selfup(config: &std::path::Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("selfup")?;
    cmd.env("NO_COLOR", "1")
        .env_remove("GITHUB_TOKEN")
        .env_remove("SELFUP_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    Ok(cmd)
}

#[test]
fn test_version_prints_build_info() -> Result<()> {
    let temp = TempDir::new()?;

    selfup(&temp.path().join("absent.toml"))?
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Version: {VERSION}")))
        .stdout(predicate::str::contains("Last Commit: "))
        .stdout(predicate::str::contains("Build Date: "))
        .stdout(predicate::str::contains("https://github.com/selfup-dev/selfup"));
    Ok(())
}

#[test]
fn test_ver_alias() -> Result<()> {
    let temp = TempDir::new()?;

    selfup(&temp.path().join("absent.toml"))?
        .arg("ver")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Version: {VERSION}")));
    Ok(())
}

#[test]
fn test_upgrade_help_mentions_dev() -> Result<()> {
    let temp = TempDir::new()?;

    selfup(&temp.path().join("absent.toml"))?
        .args(["version", "upgrade", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("selfup version upgrade dev"))
        .stdout(predicate::str::contains("--privilege"))
        .stdout(predicate::str::contains("--thread"));
    Ok(())
}

#[test]
fn test_same_version_needs_no_upgrade() -> Result<()> {
    let temp = TempDir::new()?;
    let bin_dir = temp.path().join("bin");
    std::fs::create_dir_all(&bin_dir)?;
    selfup_cli::test_utils::write_executable(&bin_dir.join("selfup"), b"installed")?;

    selfup(&temp.path().join("absent.toml"))?
        .env("PATH", &bin_dir)
        .args(["version", "upgrade", VERSION])
        .assert()
        .success()
        .stdout(predicate::str::contains("no need to upgrade selfup"));

    assert_eq!(std::fs::read(bin_dir.join("selfup"))?, b"installed");
    Ok(())
}

#[test]
fn test_missing_executable_exits_with_error() -> Result<()> {
    let temp = TempDir::new()?;

    selfup(&temp.path().join("absent.toml"))?
        .env("PATH", temp.path())
        .args(["version", "upgrade", "v0.0.1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot find executable 'selfup'"));
    Ok(())
}

#[test]
fn test_malformed_config_is_reported() -> Result<()> {
    let temp = TempDir::new()?;
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[upgrade\n")?;

    selfup(&config)?
        .arg("version")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upgrade_replaces_installed_binary() -> Result<()> {
    let install = Installation::new("selfup", b"selfup old").await?;
    install.publish_latest("v99.0.0", b"selfup v99.0.0");
    let config = install.write_config("show_progress = false\nthreads = 2\n")?;

    let mut cmd = selfup(&config)?;
    cmd.env("PATH", &install.bin_dir).args(["version", "upgrade"]);
    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stdout: {stdout}\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("prepare to upgrade to v99.0.0"));
    assert!(stdout.contains("start to download from"));
    assert_eq!(install.installed(), b"selfup v99.0.0");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_up_to_date_against_latest_release() -> Result<()> {
    let install = Installation::new("selfup", b"selfup current").await?;
    install.publish_latest(VERSION, b"should not be installed");
    let config = install.write_config("")?;

    let mut cmd = selfup(&config)?;
    cmd.env("PATH", &install.bin_dir).args(["version", "upgrade"]);
    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no need to upgrade selfup"));
    assert_eq!(install.installed(), b"selfup current");
    assert_eq!(install.server.hits(&install.artifact_path(VERSION)), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_changelog_of_running_version() -> Result<()> {
    let install = Installation::new("selfup", b"selfup current").await?;
    install.server.serve_json(
        "/repos/selfup-dev/selfup/releases",
        &format!(r#"[{{"tag_name":"{VERSION}","body":"- faster downloads"}}]"#),
    );
    let config = install.write_config("")?;

    let mut cmd = selfup(&config)?;
    cmd.args(["version", "--changelog"]);
    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Changelog:"));
    assert!(stdout.contains("- faster downloads"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_quiet_upgrade_prints_nothing() -> Result<()> {
    let install = Installation::new("selfup", b"selfup old").await?;
    install.publish("v98.0.0", b"selfup v98.0.0");
    let config = install.write_config("")?;

    let mut cmd = selfup(&config)?;
    cmd.env("PATH", &install.bin_dir)
        .args(["--quiet", "--no-progress", "version", "upgrade", "v98.0.0"]);
    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(install.installed(), b"selfup v98.0.0");
    Ok(())
}

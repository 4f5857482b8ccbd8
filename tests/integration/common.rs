//! Shared helpers for the integration suite.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use selfup_cli::test_utils::{HttpFixture, TarGzBuilder, init_test_logging, write_executable};
use selfup_cli::upgrade::UpgradeTarget;
use std::path::PathBuf;
use tempfile::TempDir;

/// A fake installation: a directory holding one executable, plus a local
/// server publishing releases for it.
pub struct Installation {
    pub temp: TempDir,
    pub bin_dir: PathBuf,
    pub binary: PathBuf,
    pub server: HttpFixture,
    pub org: &'static str,
    pub repo: &'static str,
    pub name: &'static str,
}

impl Installation {
    /// Install `name` with `content` and start an empty release server.
    pub async fn new(name: &'static str, content: &[u8]) -> Result<Self> {
        init_test_logging(None);
        let temp = TempDir::new()?;
        let bin_dir = temp.path().join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        let binary = bin_dir.join(name);
        write_executable(&binary, content)?;

        Ok(Self {
            temp,
            bin_dir,
            binary,
            server: HttpFixture::start().await,
            org: "selfup-dev",
            repo: "selfup",
            name,
        })
    }

    /// Target whose archives are served by the local server.
    pub fn target(&self) -> UpgradeTarget {
        UpgradeTarget::new(self.org, self.repo, self.name)
            .with_download_base_url(self.server.base_url())
    }

    /// Publish `tag` as the latest release, with an archive holding `payload`.
    pub fn publish_latest(&self, tag: &str, payload: &[u8]) {
        self.server.serve_json(
            &format!("/repos/{}/{}/releases/latest", self.org, self.repo),
            &format!(r#"{{"tag_name":"{tag}","body":"release {tag}"}}"#),
        );
        self.publish(tag, payload);
    }

    /// Publish an archive for `tag` holding `payload` as the executable.
    pub fn publish(&self, tag: &str, payload: &[u8]) {
        let archive = TarGzBuilder::new()
            .file("README.md", b"read me", 0o644)
            .file(self.name, payload, 0o755)
            .build();
        self.server.serve(&self.artifact_path(tag), archive);
    }

    /// Server path of the archive for `tag`.
    pub fn artifact_path(&self, tag: &str) -> String {
        let url = self.target().default_download_url(tag);
        url.trim_start_matches(&self.server.base_url()).to_string()
    }

    /// Current content of the installed binary.
    pub fn installed(&self) -> Vec<u8> {
        std::fs::read(&self.binary).unwrap_or_default()
    }

    /// Write a global config pointing every host at the local server.
    pub fn write_config(&self, extra: &str) -> Result<PathBuf> {
        let path = self.temp.path().join("config.toml");
        let base = self.server.base_url();
        std::fs::write(
            &path,
            format!(
                "[upgrade]\ndownload_base_url = \"{base}\"\napi_base_url = \"{base}\"\n{extra}"
            ),
        )?;
        Ok(path)
    }
}

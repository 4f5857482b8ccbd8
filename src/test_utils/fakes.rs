//! In-memory collaborators for tests.

use anyhow::{Result, anyhow};
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::Printer;
use crate::github::{ReleaseAsset, ReleaseSource};

/// [`Printer`] that records every line.
#[derive(Default)]
pub struct RecordingPrinter {
    lines: Mutex<Vec<String>>,
}

impl RecordingPrinter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("printer lock").clone()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    fn push(&self, line: String) {
        self.lines.lock().expect("printer lock").push(line);
    }
}

impl Printer for RecordingPrinter {
    fn print(&self, msg: &str) {
        self.push(msg.to_string());
    }

    fn println(&self, msg: &str) {
        self.push(msg.to_string());
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        self.push(args.to_string());
    }
}

/// [`ReleaseSource`] answering from a fixed list of releases.
///
/// The first release is the latest one. With no releases, every latest
/// lookup fails as if the service were unreachable.
#[derive(Default)]
pub struct StaticReleaseSource {
    releases: Vec<ReleaseAsset>,
    calls: AtomicUsize,
}

impl StaticReleaseSource {
    /// A source whose latest release is `tag`.
    pub fn with_latest(tag: &str) -> Self {
        Self::with_releases(vec![ReleaseAsset::new(tag, format!("notes for {tag}"))])
    }

    /// A source holding `releases`, newest first.
    pub fn with_releases(releases: Vec<ReleaseAsset>) -> Self {
        Self {
            releases,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that is always unreachable.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Number of lookups performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReleaseSource for StaticReleaseSource {
    async fn latest_release(&self, org: &str, repo: &str) -> Result<ReleaseAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.releases
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("connection refused while querying {org}/{repo}"))
    }

    async fn release_by_tag(
        &self,
        org: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<ReleaseAsset>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.releases.is_empty() {
            return Err(anyhow!("connection refused while querying {org}/{repo}"));
        }
        Ok(self.releases.iter().find(|r| r.tag_name == tag).cloned())
    }
}

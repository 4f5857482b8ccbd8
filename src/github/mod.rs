//! Release metadata collaborator.
//!
//! The upgrade pipeline only needs two questions answered about a
//! repository's releases: "what is the latest release?" and "what does the
//! release for this tag say?". [`ReleaseSource`] is that narrow seam;
//! [`GitHubReleaseClient`] answers it from the GitHub REST API and tests
//! substitute an in-memory source.

pub mod client;

pub use client::GitHubReleaseClient;

use anyhow::Result;
use serde::Deserialize;
use std::future::Future;

/// Tag name and body text of a published release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// Git tag the release was cut from (e.g. `v1.2.0`)
    pub tag_name: String,
    /// Release notes; empty when the release has none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

impl ReleaseAsset {
    /// Create a release asset.
    pub fn new(tag_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            body: body.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Source of release metadata for an `org/repo` pair.
pub trait ReleaseSource: Send + Sync {
    /// The most recent non-prerelease release.
    fn latest_release(
        &self,
        org: &str,
        repo: &str,
    ) -> impl Future<Output = Result<ReleaseAsset>> + Send;

    /// The release cut from `tag`, or `None` when no such release exists.
    fn release_by_tag(
        &self,
        org: &str,
        repo: &str,
        tag: &str,
    ) -> impl Future<Output = Result<Option<ReleaseAsset>>> + Send;
}

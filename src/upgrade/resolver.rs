//! Release resolution.
//!
//! Turns what the user asked for into the concrete tag that will be
//! installed:
//!
//! | Requested        | Resolved tag                      | Upgrade needed            |
//! |------------------|-----------------------------------|---------------------------|
//! | `dev`            | `master`                          | always                    |
//! | `""` or `latest` | latest release of `org/repo`      | unless equal to current   |
//! | anything else    | used verbatim                     | unless equal to current   |
//!
//! The release-metadata service is only consulted for the latest release.
//! Failing to reach it is fatal for the attempt and is never retried.

use anyhow::Result;
use tracing::{debug, info};

use crate::constants::{DEV_BRANCH, DEV_VERSION_ALIAS, LATEST_VERSION_ALIAS};
use crate::core::SelfupError;
use crate::github::ReleaseSource;

/// Outcome of resolving a requested version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The tag to install. Never empty.
    pub tag: String,
    /// False when `tag` is already the running version.
    pub needs_upgrade: bool,
}

/// Resolves requested versions against a [`ReleaseSource`].
pub struct ReleaseResolver<'a, S: ReleaseSource> {
    source: &'a S,
    org: &'a str,
    repo: &'a str,
}

impl<'a, S: ReleaseSource> ReleaseResolver<'a, S> {
    /// Resolve releases of `org/repo` through `source`.
    pub fn new(source: &'a S, org: &'a str, repo: &'a str) -> Self {
        Self {
            source,
            org,
            repo,
        }
    }

    /// Determine the tag to install for `requested` given the running
    /// `current` version.
    ///
    /// # Errors
    ///
    /// - [`SelfupError::ResolutionFailed`] when the latest release cannot be fetched
    /// - [`SelfupError::EmptyVersion`] when the release service reports an empty tag
    pub async fn resolve(&self, requested: &str, current: &str) -> Result<Resolution> {
        let requested = requested.trim();

        if requested == DEV_VERSION_ALIAS {
            debug!("Version alias '{}' maps to branch '{}'", DEV_VERSION_ALIAS, DEV_BRANCH);
            return Ok(Resolution {
                tag: DEV_BRANCH.to_string(),
                needs_upgrade: true,
            });
        }

        let tag = if requested.is_empty() || requested == LATEST_VERSION_ALIAS {
            self.latest_tag().await?
        } else {
            requested.to_string()
        };

        let needs_upgrade = tag != current;
        info!(
            "Resolved version '{}' -> '{}' (current: {}, upgrade: {})",
            requested, tag, current, needs_upgrade
        );
        Ok(Resolution {
            tag,
            needs_upgrade,
        })
    }

    async fn latest_tag(&self) -> Result<String> {
        debug!("Querying latest release of {}/{}", self.org, self.repo);
        let release = self.source.latest_release(self.org, self.repo).await.map_err(|e| {
            SelfupError::ResolutionFailed {
                org: self.org.to_string(),
                repo: self.repo.to_string(),
                reason: format!("{e:#}"),
            }
        })?;

        if release.tag_name.trim().is_empty() {
            return Err(SelfupError::EmptyVersion.into());
        }
        Ok(release.tag_name)
    }
}

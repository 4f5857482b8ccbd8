//! Build-time version information.
//!
//! [`BuildInfo`] holds the version, commit and build date of the running
//! binary. The values are fixed at compile time for the real binary and are
//! passed by value into the upgrade orchestrator; tests construct their own
//! with [`BuildInfo::new`] instead of mutating global state.
//!
//! The version defaults to the release tag of the package version
//! (`v0.3.2`), which is what the resolver compares against published tags.
//! The version, commit and date can be stamped at compile time:
//!
//! ```bash
//! SELFUP_BUILD_VERSION=dev-$(git rev-parse --short HEAD) \
//! SELFUP_BUILD_COMMIT=$(git rev-parse --short HEAD) \
//! SELFUP_BUILD_DATE=$(date -u +%Y-%m-%dT%H:%M:%SZ) \
//! cargo build --release
//! ```

use crate::constants::{BINARY_NAME, DEV_BUILD_PREFIX};

/// Version, commit and build date of a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    name: String,
    version: String,
    commit: String,
    date: String,
}

impl BuildInfo {
    /// Create build info from explicit values.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        commit: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            commit: commit.into(),
            date: date.into(),
        }
    }

    /// Build info of this binary as stamped at compile time.
    ///
    /// The version is in release tag form (`v<package version>`) unless
    /// `SELFUP_BUILD_VERSION` stamps another one, such as `dev-1a2b3c`.
    #[must_use]
    pub fn current() -> Self {
        Self::new(
            BINARY_NAME,
            option_env!("SELFUP_BUILD_VERSION")
                .unwrap_or(concat!("v", env!("CARGO_PKG_VERSION"))),
            option_env!("SELFUP_BUILD_COMMIT").unwrap_or("unknown"),
            option_env!("SELFUP_BUILD_DATE").unwrap_or("unknown"),
        )
    }

    /// Program name shown in the combined version string.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version string (e.g. `v1.2.0` or `dev-1a2b3c`).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The commit the binary was built from.
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// The build date.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Combined `name; version; commit` string, suitable for user agents.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}; {}; {}", self.name, self.version, self.commit)
    }

    /// The version with any `dev-` prefix removed, used for changelog lookups.
    pub fn release_version(&self) -> &str {
        self.version.strip_prefix(DEV_BUILD_PREFIX).unwrap_or(&self.version)
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

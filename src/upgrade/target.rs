use std::fmt;
use std::sync::Arc;

use crate::constants::{ARCHIVE_EXTENSION, DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_PATH_SEPARATOR};
use crate::utils::platform::{arch_name, os_name};

/// Builds the archive URL for a resolved tag.
pub type DownloadUrlFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// What is being upgraded and where its releases live.
///
/// Immutable for the duration of an upgrade. The artifact URL defaults to
/// `<base>/<org>/<repo>/releases/download/<tag>/<name><sep><os><sep><arch>.tar.gz`;
/// a custom URL function takes precedence when set.
///
/// # Examples
///
/// ```rust
/// use selfup_cli::upgrade::UpgradeTarget;
///
/// let target = UpgradeTarget::new("jenkins-zh", "jenkins-cli", "jcli")
///     .with_path_separator("_");
/// let url = target.default_download_url("v0.0.30");
/// assert!(url.starts_with("https://github.com/jenkins-zh/jenkins-cli/releases/download/v0.0.30/jcli_"));
///
/// let mirrored = target.with_download_url(|tag| format!("https://mirror.example.com/jcli/{tag}.tar.gz"));
/// assert_eq!(mirrored.download_url("v0.0.30"), "https://mirror.example.com/jcli/v0.0.30.tar.gz");
/// ```
#[derive(Clone)]
pub struct UpgradeTarget {
    org: String,
    repo: String,
    name: String,
    path_separator: String,
    download_base_url: String,
    custom_download_url: Option<DownloadUrlFn>,
    command_path: Vec<String>,
}

impl UpgradeTarget {
    /// Target the executable `name` released from `org/repo`.
    pub fn new(org: impl Into<String>, repo: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            name: name.into(),
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            custom_download_url: None,
            command_path: vec!["version".to_string(), "upgrade".to_string()],
        }
    }

    /// Separator between name, OS and architecture; empty keeps the default `-`.
    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.path_separator = separator;
        }
        self
    }

    /// Scheme and host of the release download server.
    pub fn with_download_base_url(mut self, url: impl Into<String>) -> Self {
        self.download_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build archive URLs with `f` instead of the default pattern.
    pub fn with_download_url<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.custom_download_url = Some(Arc::new(f));
        self
    }

    /// Subcommand path that runs the upgrade, used when re-invoking with
    /// elevated privileges (default `version upgrade`).
    pub fn with_command_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Organization owning the repository.
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Repository publishing the releases.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Executable name, both in the search path and inside the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subcommand path that runs the upgrade.
    pub fn command_path(&self) -> &[String] {
        &self.command_path
    }

    /// Whether a custom URL function is configured.
    pub fn has_custom_download_url(&self) -> bool {
        self.custom_download_url.is_some()
    }

    /// Artifact file name for this platform (`<name><sep><os><sep><arch>.tar.gz`).
    pub fn artifact_name(&self) -> String {
        let sep = &self.path_separator;
        format!("{}{sep}{}{sep}{}.{ARCHIVE_EXTENSION}", self.name, os_name(), arch_name())
    }

    /// URL of the archive for `tag` following the default pattern.
    pub fn default_download_url(&self, tag: &str) -> String {
        format!(
            "{}/{}/{}/releases/download/{tag}/{}",
            self.download_base_url,
            self.org,
            self.repo,
            self.artifact_name()
        )
    }

    /// URL the archive for `tag` is fetched from.
    pub fn download_url(&self, tag: &str) -> String {
        match &self.custom_download_url {
            Some(f) => f(tag),
            None => self.default_download_url(tag),
        }
    }

    /// URL of the project page.
    pub fn project_url(&self) -> String {
        format!("{}/{}/{}", self.download_base_url, self.org, self.repo)
    }
}

impl fmt::Debug for UpgradeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeTarget")
            .field("org", &self.org)
            .field("repo", &self.repo)
            .field("name", &self.name)
            .field("path_separator", &self.path_separator)
            .field("download_base_url", &self.download_base_url)
            .field("custom_download_url", &self.custom_download_url.is_some())
            .field("command_path", &self.command_path)
            .finish()
    }
}

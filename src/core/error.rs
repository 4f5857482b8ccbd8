//! Error handling for selfup
//!
//! This module provides the error taxonomy of the upgrade pipeline and the
//! user-friendly rendering used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so callers can branch on the failing stage
//! 2. **User-friendly messages** with an actionable suggestion where one exists
//!
//! # Architecture
//!
//! - [`SelfupError`] - Enumerated error types for every failure in the pipeline
//! - [`ErrorKind`] - The stage category an error belongs to
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! # Error Categories
//!
//! | Kind | Raised by | Recoverable |
//! |------|-----------|-------------|
//! | [`ErrorKind::Resolution`] | release resolver | no |
//! | [`ErrorKind::Permission`] | installer write check | only through elevation |
//! | [`ErrorKind::Download`] | archive fetcher | no, never retried |
//! | [`ErrorKind::Extraction`] | archive extractor | no |
//! | [`ErrorKind::Install`] | installer locate/copy | no |
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfup_cli::core::{ErrorKind, SelfupError, user_friendly_error};
//!
//! let error = SelfupError::PayloadNotFound {
//!     name: "jcli".to_string(),
//!     archive: "/tmp/jcli.tar.gz".to_string(),
//! };
//! assert_eq!(error.kind(), ErrorKind::Extraction);
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for selfup operations.
///
/// Every variant carries the operation and the path or URL involved so that
/// a failure can be diagnosed from the message alone.
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::core::{ErrorKind, SelfupError};
///
/// fn handle(error: &SelfupError) {
///     match error.kind() {
///         ErrorKind::Permission => eprintln!("try again with --privilege"),
///         ErrorKind::Download => eprintln!("check your network connection"),
///         _ => eprintln!("upgrade failed: {error}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum SelfupError {
    /// The latest release could not be determined.
    ///
    /// Raised when the release-metadata service is unreachable or answers
    /// with something that is not a release. There is no retry.
    #[error("Cannot get the latest version of {org}/{repo}: {reason}")]
    ResolutionFailed {
        /// Organization that owns the repository
        org: String,
        /// Repository name
        repo: String,
        /// Underlying failure reason
        reason: String,
    },

    /// A specific release tag does not exist.
    #[error("Release '{tag}' was not found")]
    ReleaseNotFound {
        /// The tag that was looked up
        tag: String,
    },

    /// Resolution produced an empty tag.
    #[error("Resolved version is empty")]
    EmptyVersion,

    /// The installed binary (or its directory) cannot be written.
    #[error("Permission denied while trying to {operation}: {path}")]
    PermissionDenied {
        /// The operation that was refused (e.g. "open for write")
        operation: String,
        /// The path the operation targeted
        path: String,
    },

    /// Elevation was requested but no elevation helper exists on this system.
    #[error("Permission denied on {path} and '{helper}' is not available to elevate privileges")]
    ElevationUnavailable {
        /// The helper that was looked up (e.g. "sudo")
        helper: String,
        /// The path that could not be written
        path: String,
    },

    /// A transport-level failure while downloading.
    #[error("Cannot download from {url}: {reason}")]
    DownloadFailed {
        /// The URL being downloaded
        url: String,
        /// Underlying failure reason
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("Download from {url} failed with HTTP status {status}")]
    HttpStatus {
        /// The URL being downloaded
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// The archive is malformed or could not be decompressed or copied.
    #[error("Cannot extract from archive {archive}: {reason}")]
    ExtractionFailed {
        /// Path of the archive being read
        archive: String,
        /// Underlying failure reason
        reason: String,
    },

    /// The archive contains no regular file with the executable's name.
    #[error("Archive {archive} does not contain '{name}'")]
    PayloadNotFound {
        /// The executable name searched for
        name: String,
        /// Path of the archive that was searched
        archive: String,
    },

    /// The executable could not be located in the search path.
    #[error("Cannot find executable '{name}' in search path")]
    ExecutableNotFound {
        /// The executable name that was looked up
        name: String,
    },

    /// Replacing the installed binary failed.
    ///
    /// The installed binary may be left corrupted when the system-copy
    /// strategy fails midway.
    #[error("Cannot install {source_path} to {target}: {reason}")]
    InstallFailed {
        /// The extracted payload
        source_path: String,
        /// The installed binary being replaced
        target: String,
        /// Underlying failure reason
        reason: String,
    },

    /// The configuration file is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Stage category of a [`SelfupError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Cannot determine the target version
    Resolution,
    /// Cannot write the installed binary
    Permission,
    /// Network or transport failure during fetch
    Download,
    /// Malformed archive or missing payload
    Extraction,
    /// Failure locating or replacing the installed binary
    Install,
    /// Invalid configuration
    Config,
    /// Uncategorized
    Other,
}

impl SelfupError {
    /// Returns the pipeline stage this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ResolutionFailed { .. } | Self::ReleaseNotFound { .. } | Self::EmptyVersion => {
                ErrorKind::Resolution
            }
            Self::PermissionDenied { .. } | Self::ElevationUnavailable { .. } => {
                ErrorKind::Permission
            }
            Self::DownloadFailed { .. } | Self::HttpStatus { .. } => ErrorKind::Download,
            Self::ExtractionFailed { .. } | Self::PayloadNotFound { .. } => ErrorKind::Extraction,
            Self::ExecutableNotFound { .. } | Self::InstallFailed { .. } => ErrorKind::Install,
            Self::ConfigError { .. } => ErrorKind::Config,
            Self::Other { .. } => ErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolution => "resolution",
            Self::Permission => "permission",
            Self::Download => "download",
            Self::Extraction => "extraction",
            Self::Install => "install",
            Self::Config => "config",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Error wrapper with user-facing details and a suggestion.
///
/// Produced by [`user_friendly_error`] and printed by the CLI entry point.
#[derive(Debug)]
pub struct ErrorContext {
    /// The rendered error message, including the anyhow context chain
    pub message: String,
    /// Stage category, when the chain contains a [`SelfupError`]
    pub kind: Option<ErrorKind>,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a message with no suggestion or details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// The whole context chain is kept in the message (`outer: inner: root`), so
/// the operation and the path or URL attached with `.context(...)` survive.
/// When a [`SelfupError`] is found anywhere in the chain, a suggestion for its
/// stage is attached.
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::core::user_friendly_error;
///
/// let error = anyhow::anyhow!("Something went wrong");
/// let context = user_friendly_error(error);
/// context.display();
/// ```
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    if let Some(selfup_error) = error.chain().find_map(|e| e.downcast_ref::<SelfupError>()) {
        return create_error_context(message, selfup_error);
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<std::io::Error>())
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        let mut ctx = ErrorContext::new(message)
            .with_suggestion("Re-run with --privilege or check the ownership of the installed binary");
        ctx.kind = Some(ErrorKind::Permission);
        return ctx;
    }

    ErrorContext::new(message)
}

fn create_error_context(message: String, error: &SelfupError) -> ErrorContext {
    let kind = error.kind();
    let ctx = match error {
        SelfupError::ResolutionFailed { .. } => ErrorContext::new(message)
            .with_suggestion("Check your network connection, or pass an explicit version to skip the lookup")
            .with_details("The latest release is queried from the GitHub API; set GITHUB_TOKEN if you are rate limited"),
        SelfupError::ReleaseNotFound { .. } => ErrorContext::new(message)
            .with_suggestion("List the published releases and pick an existing tag"),
        SelfupError::PermissionDenied { .. } => ErrorContext::new(message)
            .with_suggestion("Re-run with --privilege to retry through the elevation helper")
            .with_details("Nothing was downloaded or changed"),
        SelfupError::ElevationUnavailable { helper, .. } => ErrorContext::new(message)
            .with_suggestion(format!("Install '{helper}' or re-run the upgrade from an account that owns the binary")),
        SelfupError::DownloadFailed { .. } | SelfupError::HttpStatus { .. } => {
            ErrorContext::new(message)
                .with_suggestion("Check that the release exists for your platform and that the host is reachable")
        }
        SelfupError::ExtractionFailed { .. } => ErrorContext::new(message)
            .with_details("The downloaded archive is not a valid gzip-compressed tar file"),
        SelfupError::PayloadNotFound { .. } => ErrorContext::new(message)
            .with_details("The release archive was downloaded but holds no file with the executable's name")
            .with_suggestion("Check that the release publishes an archive for your platform"),
        SelfupError::ExecutableNotFound { .. } => ErrorContext::new(message)
            .with_suggestion("Make sure the executable's directory is listed in PATH"),
        SelfupError::InstallFailed { .. } => ErrorContext::new(message)
            .with_details("The installed binary may be incomplete; reinstall it manually if it no longer starts"),
        SelfupError::ConfigError { .. } => ErrorContext::new(message)
            .with_suggestion("Fix the TOML syntax in the selfup config file or remove it to use defaults"),
        SelfupError::EmptyVersion | SelfupError::Other { .. } => {
            ErrorContext::new(message)
        }
    };
    ErrorContext {
        kind: Some(kind),
        ..ctx
    }
}

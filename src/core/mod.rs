//! Core types shared by every stage of the upgrade pipeline
//!
//! # Modules
//!
//! ## `error` - Error Taxonomy
//!
//! - [`SelfupError`] - Enumerated failure modes of resolution, download,
//!   extraction and installation
//! - [`ErrorKind`] - The stage an error belongs to
//! - [`ErrorContext`] / [`user_friendly_error`] - Colored rendering with
//!   suggestions for the CLI
//!
//! ## `printer` - Output Collaborator
//!
//! - [`Printer`] - Line-oriented sink for user-facing status messages
//! - [`ConsolePrinter`] - Terminal implementation honoring `--quiet`
//!
//! # Error Handling Pattern
//!
//! Library functions return `anyhow::Result` and attach the operation plus
//! the path or URL involved with `.context(...)`. Where a caller may want to
//! branch on the failing stage, the root cause is a [`SelfupError`]:
//!
//! ```rust,no_run
//! use anyhow::Context;
//! use selfup_cli::core::SelfupError;
//!
//! fn locate(name: &str) -> anyhow::Result<std::path::PathBuf> {
//!     which::which(name)
//!         .map_err(|_| SelfupError::ExecutableNotFound { name: name.to_string() })
//!         .with_context(|| format!("Failed to locate {name}"))
//! }
//! ```

pub mod error;
pub mod printer;

pub use error::{ErrorContext, ErrorKind, SelfupError, user_friendly_error};
pub use printer::{ConsolePrinter, Printer};

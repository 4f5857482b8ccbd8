//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`platform`] - Release platform naming, search-path lookup, permission checks
//! - [`progress`] - Download progress bars
//!
//! # Example
//!
//! ```rust,no_run
//! use selfup_cli::utils::{ProgressBar, arch_name, os_name};
//!
//! println!("artifact suffix: {}-{}", os_name(), arch_name());
//!
//! let progress = ProgressBar::for_download(Some(100), true);
//! progress.inc(100);
//! progress.finish_and_clear();
//! ```

pub mod platform;
pub mod progress;

pub use platform::{arch_name, find_executable, is_permission_denied, is_windows, os_name};
pub use progress::ProgressBar;

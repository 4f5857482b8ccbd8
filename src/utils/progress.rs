//! Download progress reporting.
//!
//! Wraps `indicatif` with selfup styling. Progress is purely observational:
//! every method is infallible and a hidden bar silently ignores all updates,
//! so download code can report unconditionally.
//!
//! # CI and Automation Support
//!
//! Progress bars are hidden when:
//! - The caller passes `show_progress = false`
//! - The `SELFUP_NO_PROGRESS` environment variable is set (`--no-progress`)
//! - stderr is not a terminal (handled by `indicatif` itself)

use crate::constants::NO_PROGRESS_ENV;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Checks if progress bars are disabled through the environment.
fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A byte-counting progress bar shared by all download tasks.
///
/// Cloning is cheap and every clone drives the same bar, which is how the
/// range tasks of a parallel download report into a single display.
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::utils::progress::ProgressBar;
///
/// let progress = ProgressBar::for_download(Some(1024), true);
/// progress.set_message("jcli.tar.gz");
/// progress.inc(512);
/// progress.inc(512);
/// progress.finish_and_clear();
/// ```
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar for a download of `total` bytes.
    ///
    /// When the size is unknown a spinner showing the byte count is used.
    /// When `show` is false, or progress is disabled by the environment,
    /// the bar is hidden.
    pub fn for_download(total: Option<u64>, show: bool) -> Self {
        if !show || is_progress_disabled() {
            return Self::hidden();
        }

        let bar = match total {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(download_style());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Sets the message displayed alongside the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Adds `delta` bytes to the progress.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position in bytes.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Completes the bar and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {bytes} ({bytes_per_sec})")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

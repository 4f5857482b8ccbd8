//! Test utilities for selfup
//!
//! This module provides helpers shared by unit tests and the integration
//! suite:
//! - [`init_test_logging`] - once-guarded tracing subscriber for tests
//! - [`RecordingPrinter`] - a [`Printer`](crate::core::Printer) that captures lines
//! - [`StaticReleaseSource`] - in-memory release metadata with call counting
//! - [`TarGzBuilder`] - builds `.tar.gz` archives with explicit modes and entry types
//! - [`HttpFixture`] - a local HTTP/1.1 server with `HEAD` and `Range` support
//!
//! # Example
//!
//! ```rust,no_run
//! use selfup_cli::test_utils::{HttpFixture, TarGzBuilder};
//!
//! # async fn example() {
//! let archive = TarGzBuilder::new().file("jcli", b"binary", 0o755).build();
//! let server = HttpFixture::start().await;
//! server.serve("/jcli.tar.gz", archive);
//! let url = server.url("/jcli.tar.gz");
//! # }
//! ```

pub mod archive;
pub mod fakes;
pub mod http;

pub use archive::TarGzBuilder;
pub use fakes::{RecordingPrinter, StaticReleaseSource};
pub use http::{HttpFixture, RecordedRequest};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber only once regardless of how many times
/// it's called. Uses the provided level, or `RUST_LOG` when no level is given.
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            // No logging if neither is provided
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Write a fake executable file with mode `0o755` on Unix.
pub fn write_executable(path: &std::path::Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

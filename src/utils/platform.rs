//! Platform-specific helpers.
//!
//! Release artifacts are named after the Go-style platform identifiers used
//! by most GitHub release pipelines (`linux`, `darwin`, `amd64`, `arm64`), so
//! this module translates Rust's target constants into those names. It also
//! wraps search-path lookup and permission classification.

use anyhow::Result;
use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Operating system identifier used in release artifact names.
///
/// | Rust `target_os` | Artifact name |
/// |------------------|---------------|
/// | `macos`          | `darwin`      |
/// | anything else    | unchanged     |
#[must_use]
pub fn os_name() -> &'static str {
    map_os(std::env::consts::OS)
}

/// CPU architecture identifier used in release artifact names.
///
/// | Rust `target_arch` | Artifact name |
/// |--------------------|---------------|
/// | `x86_64`           | `amd64`       |
/// | `aarch64`          | `arm64`       |
/// | `x86`              | `386`         |
/// | `powerpc64`        | `ppc64`       |
/// | anything else      | unchanged     |
#[must_use]
pub fn arch_name() -> &'static str {
    map_arch(std::env::consts::ARCH)
}

fn map_os(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn map_arch(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Resolve an executable name to its absolute path.
///
/// Searches `search_path` when given (same format as `PATH`), otherwise the
/// process `PATH`. On Windows `PATHEXT` extensions are honored.
///
/// # Errors
///
/// Returns the lookup error when no executable with that name exists.
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Result<PathBuf> {
    let found = match search_path {
        Some(paths) => {
            let cwd = std::env::current_dir()?;
            which::which_in(name, Some(paths), cwd)?
        }
        None => which::which(name)?,
    };
    Ok(found)
}

/// Whether an IO error is a permission failure.
#[must_use]
pub fn is_permission_denied(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem)
}

/// Gets the home directory path for the current user.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

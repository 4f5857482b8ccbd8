//! Payload extraction from release archives.
//!
//! A release archive is a gzip-compressed tar holding the executable plus
//! whatever else the release ships (README, LICENSE, completions). Only the
//! regular-file entry whose path equals the executable name is extracted; it
//! lands next to the archive with the mode recorded in the tar header.
//!
//! The walk always reads to the end of the archive. A conformant archive
//! has at most one matching entry; if there are several, the first wins and
//! the rest are skipped without reading their bodies.

use anyhow::Result;
use flate2::read::GzDecoder;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info, warn};

use crate::core::SelfupError;

/// Extract the entry named `name` from the `.tar.gz` at `archive`.
///
/// Returns the path of the extracted file (`<archive dir>/<name>`), or
/// `None` when the archive holds no regular file with that name. Any
/// existing file at the destination is truncated and overwritten.
///
/// # Errors
///
/// [`SelfupError::ExtractionFailed`] when the archive cannot be opened,
/// is not valid gzip/tar, or the payload cannot be written.
pub fn extract_payload(archive: &Path, name: &str) -> Result<Option<PathBuf>> {
    let dest_dir = archive.parent().unwrap_or_else(|| Path::new("."));
    let dest = dest_dir.join(name);

    let file = File::open(archive).map_err(|e| extraction_error(archive, "open archive", &e))?;
    let mut tar = Archive::new(GzDecoder::new(file));
    let entries = tar.entries().map_err(|e| extraction_error(archive, "read entries", &e))?;

    let mut extracted = None;
    for entry in entries {
        let mut entry = entry.map_err(|e| extraction_error(archive, "read entry", &e))?;
        let header = entry.header();
        let entry_type = header.entry_type();
        let path = entry.path().map_err(|e| extraction_error(archive, "read entry path", &e))?;

        if !entry_type.is_file() || path != Path::new(name) {
            debug!("Skipping archive entry {} ({:?})", path.display(), entry_type);
            continue;
        }
        if extracted.is_some() {
            warn!("Archive {} holds more than one '{}', keeping the first", archive.display(), name);
            continue;
        }

        let mode = entry.header().mode().map_err(|e| extraction_error(archive, "read mode", &e))?;
        let mut out = create_payload_file(&dest, mode)
            .map_err(|e| extraction_error(archive, &format!("create {}", dest.display()), &e))?;
        let written = io::copy(&mut entry, &mut out)
            .map_err(|e| extraction_error(archive, &format!("write {}", dest.display()), &e))?;
        set_mode(&dest, mode)
            .map_err(|e| extraction_error(archive, &format!("chmod {}", dest.display()), &e))?;

        info!("Extracted {} ({} bytes, mode {:o}) to {}", name, written, mode, dest.display());
        extracted = Some(dest.clone());
    }

    if extracted.is_none() {
        debug!("No regular file named '{}' in {}", name, archive.display());
    }
    Ok(extracted)
}

/// [`extract_payload`] on the blocking thread pool.
pub async fn extract_payload_async(archive: PathBuf, name: String) -> Result<Option<PathBuf>> {
    tokio::task::spawn_blocking(move || extract_payload(&archive, &name)).await?
}

fn create_payload_file(dest: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(dest)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

fn extraction_error(archive: &Path, operation: &str, error: &io::Error) -> anyhow::Error {
    SelfupError::ExtractionFailed {
        archive: archive.display().to_string(),
        reason: format!("{operation}: {error}"),
    }
    .into()
}

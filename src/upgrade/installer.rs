//! Replacement of the installed binary.
//!
//! The installer walks `Locate → CheckWritable → (Elevate) → Install`:
//!
//! 1. [`BinaryInstaller::locate`] finds the installed executable in the
//!    search path.
//! 2. [`BinaryInstaller::check_writable`] opens it for write. Only a
//!    permission failure counts as denied; other errors such as
//!    "text file busy" on a running Linux binary do not stop an upgrade
//!    that replaces the file by rename.
//! 3. [`ElevationCommand`] re-runs the upgrade through the elevation helper
//!    as a child process whose exit code the caller forwards.
//! 4. [`BinaryInstaller::install`] replaces the binary using the configured
//!    [`InstallStrategy`].
//!
//! With [`InstallStrategy::Rename`] the payload is written into a temp file
//! in the target's directory and renamed over the target, so the installed
//! binary is never observed half-written. On Windows the live binary cannot
//! be replaced while running and is moved aside to `<name>.old` first.
//!
//! With [`InstallStrategy::SystemCopy`] the system `cp` overwrites the
//! target in place. A failure midway may leave the target truncated.

use anyhow::Result;
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::InstallStrategy;
use crate::constants::SYSTEM_COPY_TOOL;
use crate::core::SelfupError;
use crate::utils::platform::{find_executable, is_permission_denied};

/// Result of probing the installed binary for write access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAccess {
    /// The binary can be replaced by the current user.
    Writable,
    /// The operating system refused write access.
    Denied,
}

/// Replaces an installed executable with a freshly extracted one.
#[derive(Debug, Clone)]
pub struct BinaryInstaller {
    name: String,
    search_path: Option<OsString>,
    strategy: InstallStrategy,
}

impl BinaryInstaller {
    /// Installer for the executable `name`, looked up in the process `PATH`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search_path: None,
            strategy: InstallStrategy::default(),
        }
    }

    /// Look the executable up in `paths` (same format as `PATH`) instead.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Replace the binary with `strategy`.
    pub fn with_strategy(mut self, strategy: InstallStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The configured install strategy.
    pub fn strategy(&self) -> InstallStrategy {
        self.strategy
    }

    /// Absolute path of the installed executable.
    ///
    /// Symlinks are resolved so that the real file is replaced rather than
    /// the link pointing to it.
    ///
    /// # Errors
    ///
    /// [`SelfupError::ExecutableNotFound`] when nothing named `name` is in
    /// the search path.
    pub fn locate(&self) -> Result<PathBuf> {
        let found =
            find_executable(&self.name, self.search_path.as_deref()).map_err(|e| {
                debug!("Lookup of '{}' failed: {:#}", self.name, e);
                SelfupError::ExecutableNotFound {
                    name: self.name.clone(),
                }
            })?;
        let path = std::fs::canonicalize(&found).unwrap_or(found);
        debug!("Located installed '{}' at {}", self.name, path.display());
        Ok(path)
    }

    /// Check whether `target` can be replaced without elevated privileges.
    ///
    /// Opens the file for write without truncating it, then closes it. The
    /// rename strategy also needs to create files in the target's directory,
    /// which is checked with a temp file that is removed immediately.
    pub fn check_writable(&self, target: &Path) -> WriteAccess {
        match OpenOptions::new().write(true).open(target) {
            Ok(file) => drop(file),
            Err(e) if is_permission_denied(&e) => {
                info!("No write permission on {}: {}", target.display(), e);
                return WriteAccess::Denied;
            }
            Err(e) => debug!("Ignoring write check error on {}: {}", target.display(), e),
        }

        if self.strategy == InstallStrategy::Rename
            && let Some(dir) = target.parent()
            && let Err(e) = NamedTempFile::new_in(dir)
            && is_permission_denied(&e)
        {
            info!("No write permission on directory {}: {}", dir.display(), e);
            return WriteAccess::Denied;
        }

        WriteAccess::Writable
    }

    /// Replace `target` with the contents and permissions of `source`.
    ///
    /// # Errors
    ///
    /// - [`SelfupError::PermissionDenied`] when the replacement is refused
    /// - [`SelfupError::InstallFailed`] for any other failure, naming both paths
    pub async fn install(&self, source: &Path, target: &Path) -> Result<()> {
        info!("Installing {} over {} ({:?})", source.display(), target.display(), self.strategy);
        match self.strategy {
            InstallStrategy::Rename => {
                let source = source.to_path_buf();
                let target = target.to_path_buf();
                tokio::task::spawn_blocking(move || install_by_rename(&source, &target)).await?
            }
            InstallStrategy::SystemCopy => install_by_system_copy(source, target).await,
        }
    }
}

fn install_by_rename(source: &Path, target: &Path) -> Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(source)
        .map_err(|e| install_error(source, target, "read payload metadata", &e))?
        .permissions();

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| {
        if is_permission_denied(&e) {
            permission_error("create file in", dir)
        } else {
            install_error(source, target, "stage payload", &e)
        }
    })?;
    let mut payload =
        File::open(source).map_err(|e| install_error(source, target, "open payload", &e))?;
    io::copy(&mut payload, staged.as_file_mut())
        .map_err(|e| install_error(source, target, "copy payload", &e))?;
    staged.as_file().sync_all().map_err(|e| install_error(source, target, "sync payload", &e))?;
    std::fs::set_permissions(staged.path(), permissions)
        .map_err(|e| install_error(source, target, "set permissions", &e))?;

    let aside = if cfg!(windows) {
        move_aside(target)
            .map_err(|e| install_error(source, target, "move live binary aside", &e))?
    } else {
        None
    };

    place_or_restore(target, aside.as_deref(), || {
        staged.persist(target).map(drop).map_err(|e| {
            if is_permission_denied(&e.error) {
                permission_error("replace", target)
            } else {
                install_error(source, target, "rename into place", &e.error)
            }
        })
    })?;
    debug!("Renamed staged payload over {}", target.display());
    Ok(())
}

/// Run `place`; when it fails, rename the moved-aside binary back to `target`.
fn place_or_restore<F>(target: &Path, aside: Option<&Path>, place: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let result = place();
    if result.is_err()
        && let Some(old) = aside
    {
        match std::fs::rename(old, target) {
            Ok(()) => debug!("Restored {} after a failed install", target.display()),
            Err(e) => warn!(
                "Cannot restore {} from {}: {}",
                target.display(),
                old.display(),
                e
            ),
        }
    }
    result
}

/// Windows refuses to overwrite a running executable but allows renaming it.
///
/// Returns the `<target>.old` path the binary was moved to, or `None` when
/// there was nothing to move.
fn move_aside(target: &Path) -> io::Result<Option<PathBuf>> {
    if !target.exists() {
        return Ok(None);
    }
    let mut old = target.as_os_str().to_owned();
    old.push(".old");
    let old = PathBuf::from(old);
    if old.exists() {
        std::fs::remove_file(&old)?;
    }
    std::fs::rename(target, &old)?;
    Ok(Some(old))
}

async fn install_by_system_copy(source: &Path, target: &Path) -> Result<()> {
    let Ok(cp) = which::which(SYSTEM_COPY_TOOL) else {
        warn!("'{}' not found, copying {} in process", SYSTEM_COPY_TOOL, target.display());
        return stream_copy(source, target).await;
    };

    debug!("Executing: {} {} {}", cp.display(), source.display(), target.display());
    let status = Command::new(&cp)
        .arg(source)
        .arg(target)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| install_error(source, target, "run cp", &e))?;

    if !status.success() {
        return Err(SelfupError::InstallFailed {
            source_path: source.display().to_string(),
            target: target.display().to_string(),
            reason: format!("{} exited with {status}", cp.display()),
        }
        .into());
    }
    Ok(())
}

async fn stream_copy(source: &Path, target: &Path) -> Result<()> {
    let mut input = tokio::fs::File::open(source)
        .await
        .map_err(|e| install_error(source, target, "open payload", &e))?;
    let mut output = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)
        .await
        .map_err(|e| {
            if is_permission_denied(&e) {
                permission_error("open for write", target)
            } else {
                install_error(source, target, "open target", &e)
            }
        })?;
    tokio::io::copy(&mut input, &mut output)
        .await
        .map_err(|e| install_error(source, target, "copy payload", &e))?;
    Ok(())
}

/// A re-invocation of the upgrade through the elevation helper.
///
/// Runs `<helper> <binary> <command path...> --privilege=false
/// --show-progress=<bool> --thread <n> <tag>`. Elevation is disabled in the
/// child so a child that still lacks permission fails instead of recursing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationCommand {
    /// Resolved path of the elevation helper
    pub program: PathBuf,
    /// Arguments passed to the helper
    pub args: Vec<OsString>,
}

impl ElevationCommand {
    /// Build the re-invocation of `binary` for `tag`.
    ///
    /// # Errors
    ///
    /// [`SelfupError::ElevationUnavailable`] when `helper` is not in the
    /// process `PATH`.
    pub fn new(
        helper: &str,
        binary: &Path,
        command_path: &[String],
        tag: &str,
        show_progress: bool,
        threads: usize,
    ) -> Result<Self> {
        let program = which::which(helper).map_err(|_| SelfupError::ElevationUnavailable {
            helper: helper.to_string(),
            path: binary.display().to_string(),
        })?;
        Ok(Self::with_program(program, binary, command_path, tag, show_progress, threads))
    }

    /// Build the re-invocation with an already located helper.
    pub fn with_program(
        program: PathBuf,
        binary: &Path,
        command_path: &[String],
        tag: &str,
        show_progress: bool,
        threads: usize,
    ) -> Self {
        let mut args: Vec<OsString> = vec![binary.as_os_str().to_owned()];
        args.extend(command_path.iter().map(OsString::from));
        args.push("--privilege=false".into());
        args.push(format!("--show-progress={show_progress}").into());
        args.push("--thread".into());
        args.push(threads.to_string().into());
        args.push(tag.into());
        Self {
            program,
            args,
        }
    }

    /// Insert global flags between the binary and the command path.
    ///
    /// The elevation helper usually resets the environment, so settings such
    /// as `--config <path>` and `--no-progress` have to travel as arguments.
    pub fn with_global_args<I, S>(mut self, global_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let tail = self.args.split_off(1);
        self.args.extend(global_args.into_iter().map(Into::into));
        self.args.extend(tail);
        self
    }

    /// Run the child with inherited stdio and return its exit code.
    ///
    /// A child killed by a signal reports exit code 1.
    pub async fn run(&self) -> Result<i32> {
        info!("Re-running upgrade with {}", self.display());
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| SelfupError::Other {
                message: format!("Failed to run {}: {e}", self.program.display()),
            })?;
        let code = status.code().unwrap_or(1);
        debug!("Elevated upgrade exited with {}", code);
        Ok(code)
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn permission_error(operation: &str, path: &Path) -> anyhow::Error {
    SelfupError::PermissionDenied {
        operation: operation.to_string(),
        path: path.display().to_string(),
    }
    .into()
}

fn install_error(source: &Path, target: &Path, operation: &str, error: &io::Error) -> anyhow::Error {
    SelfupError::InstallFailed {
        source_path: source.display().to_string(),
        target: target.display().to_string(),
        reason: format!("{operation}: {error}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::test_utils::write_executable;
    use tempfile::TempDir;

    fn installer_in(dir: &Path) -> BinaryInstaller {
        BinaryInstaller::new("jcli").with_search_path(dir.as_os_str())
    }

    #[test]
    fn test_locate_in_search_path() {
        let temp = TempDir::new().unwrap();
        write_executable(&temp.path().join("jcli"), b"old").unwrap();

        let located = installer_in(temp.path()).locate().unwrap();
        assert_eq!(located, std::fs::canonicalize(temp.path().join("jcli")).unwrap());
    }

    #[test]
    fn test_locate_missing_executable() {
        let temp = TempDir::new().unwrap();
        let err = installer_in(temp.path()).locate().unwrap_err();

        let selfup = err.downcast_ref::<SelfupError>().unwrap();
        assert!(matches!(selfup, SelfupError::ExecutableNotFound { name } if name == "jcli"));
        assert_eq!(selfup.kind(), ErrorKind::Install);
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_resolves_symlinks() {
        let temp = TempDir::new().unwrap();
        let real_dir = temp.path().join("cellar");
        let bin_dir = temp.path().join("bin");
        std::fs::create_dir_all(&real_dir).unwrap();
        std::fs::create_dir_all(&bin_dir).unwrap();
        write_executable(&real_dir.join("jcli"), b"old").unwrap();
        std::os::unix::fs::symlink(real_dir.join("jcli"), bin_dir.join("jcli")).unwrap();

        let located = installer_in(&bin_dir).locate().unwrap();
        assert_eq!(located, std::fs::canonicalize(real_dir.join("jcli")).unwrap());
    }

    #[test]
    fn test_check_writable_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        write_executable(&target, b"old").unwrap();

        assert_eq!(installer_in(temp.path()).check_writable(&target), WriteAccess::Writable);
        assert_eq!(std::fs::read(&target).unwrap(), b"old");
    }

    #[cfg(unix)]
    #[test]
    #[ignore = "root bypasses permission bits; run with --ignored as an unprivileged user"]
    fn test_read_only_file_is_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        write_executable(&target, b"old").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o555)).unwrap();

        let installer = installer_in(temp.path());
        assert_eq!(installer.check_writable(&target), WriteAccess::Denied);
        let installer = installer.with_strategy(InstallStrategy::SystemCopy);
        assert_eq!(installer.check_writable(&target), WriteAccess::Denied);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_is_denied_for_rename() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let target = bin.join("jcli");
        write_executable(&target, b"old").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o555)).unwrap();
        let root = NamedTempFile::new_in(&bin).is_ok();

        let installer = installer_in(&bin);
        if !root {
            assert_eq!(installer.check_writable(&target), WriteAccess::Denied);
        }
        let copy = installer.with_strategy(InstallStrategy::SystemCopy);
        assert_eq!(copy.check_writable(&target), WriteAccess::Writable);

        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_install_by_rename() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        let source = temp.path().join("payload");
        write_executable(&target, b"old binary").unwrap();
        write_executable(&source, b"new binary").unwrap();

        installer_in(temp.path()).install(&source, &target).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new binary");
        assert!(source.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o755);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_by_system_copy() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        let source = temp.path().join("payload");
        write_executable(&target, b"a much longer old binary").unwrap();
        write_executable(&source, b"new").unwrap();

        let installer = installer_in(temp.path()).with_strategy(InstallStrategy::SystemCopy);
        installer.install(&source, &target).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_install_missing_payload_fails_and_keeps_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        write_executable(&target, b"old").unwrap();
        let source = temp.path().join("absent");

        for strategy in [InstallStrategy::Rename, InstallStrategy::SystemCopy] {
            let installer = installer_in(temp.path()).with_strategy(strategy);
            let err = installer.install(&source, &target).await.unwrap_err();

            let selfup = err.downcast_ref::<SelfupError>().unwrap();
            assert_eq!(selfup.kind(), ErrorKind::Install, "{strategy:?}");
            assert!(err.to_string().contains("absent"));
            assert_eq!(std::fs::read(&target).unwrap(), b"old");
        }
    }

    #[tokio::test]
    async fn test_stream_copy_truncates() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        let source = temp.path().join("payload");
        std::fs::write(&target, b"longer old contents").unwrap();
        std::fs::write(&source, b"new").unwrap();

        stream_copy(&source, &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_elevation_command_arguments() {
        let command = ElevationCommand::with_program(
            PathBuf::from("/usr/bin/sudo"),
            Path::new("/usr/local/bin/jcli"),
            &["version".to_string(), "upgrade".to_string()],
            "v0.0.30",
            false,
            4,
        );

        let args: Vec<String> =
            command.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "/usr/local/bin/jcli",
                "version",
                "upgrade",
                "--privilege=false",
                "--show-progress=false",
                "--thread",
                "4",
                "v0.0.30"
            ]
        );
        assert_eq!(
            command.display(),
            "/usr/bin/sudo /usr/local/bin/jcli version upgrade --privilege=false \
             --show-progress=false --thread 4 v0.0.30"
        );
    }

    #[test]
    fn test_elevation_command_forwards_global_args() {
        let command = ElevationCommand::with_program(
            PathBuf::from("/usr/bin/sudo"),
            Path::new("/usr/local/bin/selfup"),
            &["version".to_string(), "upgrade".to_string()],
            "v1",
            true,
            0,
        )
        .with_global_args(["--config", "/home/me/.selfup/config.toml", "--no-progress"]);

        assert_eq!(
            command.display(),
            "/usr/bin/sudo /usr/local/bin/selfup --config /home/me/.selfup/config.toml \
             --no-progress version upgrade --privilege=false --show-progress=true --thread 0 v1"
        );
    }

    #[test]
    fn test_failed_placement_restores_moved_binary() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        std::fs::write(&target, b"live binary").unwrap();

        let aside = move_aside(&target).unwrap().unwrap();
        assert!(!target.exists());
        assert_eq!(std::fs::read(&aside).unwrap(), b"live binary");

        let err = place_or_restore(&target, Some(&aside), || {
            Err(SelfupError::Other {
                message: "rename into place failed".to_string(),
            }
            .into())
        })
        .unwrap_err();

        assert!(err.to_string().contains("rename into place failed"));
        assert_eq!(std::fs::read(&target).unwrap(), b"live binary");
        assert!(!aside.exists());
    }

    #[test]
    fn test_successful_placement_keeps_moved_binary() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("jcli");
        std::fs::write(&target, b"old").unwrap();
        std::fs::write(temp.path().join("jcli.old"), b"stale").unwrap();

        let aside = move_aside(&target).unwrap().unwrap();
        assert_eq!(std::fs::read(&aside).unwrap(), b"old");

        place_or_restore(&target, Some(&aside), || {
            std::fs::write(&target, b"new")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        assert!(move_aside(&temp.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn test_missing_elevation_helper() {
        let err = ElevationCommand::new(
            "selfup-no-such-elevation-helper",
            Path::new("/usr/local/bin/jcli"),
            &[],
            "v1",
            true,
            0,
        )
        .unwrap_err();

        let selfup = err.downcast_ref::<SelfupError>().unwrap();
        assert!(matches!(selfup, SelfupError::ElevationUnavailable { .. }));
        assert_eq!(selfup.kind(), ErrorKind::Permission);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_elevation_forwards_exit_code() {
        let temp = TempDir::new().unwrap();
        let helper = temp.path().join("fake-sudo");
        write_executable(&helper, b"#!/bin/sh\nexit 7\n").unwrap();

        let command = ElevationCommand::with_program(
            helper,
            Path::new("/usr/local/bin/jcli"),
            &["version".to_string(), "upgrade".to_string()],
            "v1",
            false,
            0,
        );
        assert_eq!(command.run().await.unwrap(), 7);
    }
}

//! Symlink-resistant open, read, and write operations.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::RunnerError;
use crate::Result;

use super::LimitedReader;

/// Default maximum size for a single read: 128 MiB.
pub const DEFAULT_MAX_READ_SIZE: u64 = 128 * 1024 * 1024;

/// Verifies that `path` is absolute and has no relative components.
///
/// Symlink resistance is meaningless for a relative path: the walk below
/// anchors every component check at the root, so the input must be anchored
/// there too.
fn ensure_absolute(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(RunnerError::InvalidFilePath {
            path: path.to_path_buf(),
            reason: "path is empty".to_string(),
        });
    }
    if !path.is_absolute() {
        return Err(RunnerError::InvalidFilePath {
            path: path.to_path_buf(),
            reason: "path is not absolute".to_string(),
        });
    }
    for component in path.components() {
        match component {
            Component::CurDir | Component::ParentDir => {
                return Err(RunnerError::InvalidFilePath {
                    path: path.to_path_buf(),
                    reason: "path contains relative components".to_string(),
                });
            }
            Component::RootDir | Component::Prefix(_) | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// Walks every parent component with a non-following stat.
///
/// Rejects the walk as soon as any component is a symlink or not a
/// directory. The leaf itself is handled separately by the `O_NOFOLLOW`
/// open, so this stops at the parent.
fn walk_parents(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };

    let mut current = PathBuf::new();
    for component in parent.components() {
        current.push(component);
        if matches!(component, Component::RootDir | Component::Prefix(_)) {
            continue;
        }
        let meta = std::fs::symlink_metadata(&current)?;
        if meta.file_type().is_symlink() {
            return Err(RunnerError::IsSymlink { path: current });
        }
        if !meta.is_dir() {
            return Err(RunnerError::InvalidFilePath {
                path: path.to_path_buf(),
                reason: format!("component {} is not a directory", current.display()),
            });
        }
    }
    Ok(())
}

/// Translates the platform error from an `O_NOFOLLOW` open.
fn translate_open_error(err: std::io::Error, path: &Path) -> RunnerError {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::ELOOP) || err.raw_os_error() == Some(libc::EMLINK) {
        return RunnerError::IsSymlink {
            path: path.to_path_buf(),
        };
    }
    if err.kind() == std::io::ErrorKind::AlreadyExists {
        return RunnerError::FileExists {
            path: path.to_path_buf(),
        };
    }
    RunnerError::Io(err)
}

/// Confirms on the open descriptor that the target is a regular file.
///
/// The check runs against the descriptor, never the path, so a post-open
/// rename or replacement of the path cannot affect the answer.
fn ensure_regular(file: &File, path: &Path) -> Result<()> {
    let meta = file.metadata()?;
    if !meta.is_file() {
        return Err(RunnerError::NotRegularFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn open_nofollow(path: &Path, options: &mut OpenOptions) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    options.custom_flags(libc::O_NOFOLLOW).open(path)
}

#[cfg(not(unix))]
fn open_nofollow(path: &Path, options: &mut OpenOptions) -> std::io::Result<File> {
    // No O_NOFOLLOW outside unix: refuse a symlink leaf with a preceding
    // non-following stat, then open. The race this reopens is accepted on
    // platforms without the flag.
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "leaf is a symlink",
        )),
        _ => options.open(path),
    }
}

#[cfg(unix)]
fn apply_mode(options: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn apply_mode(_options: &mut OpenOptions, _mode: u32) {}

/// Opens `path` read-only without following symlinks anywhere in it.
///
/// # Errors
///
/// - `RunnerError::InvalidFilePath` for empty, relative, or non-normalized
///   paths, or when a parent component is not a directory
/// - `RunnerError::IsSymlink` when any component or the leaf is a symlink
/// - `RunnerError::NotRegularFile` when the opened descriptor is not a
///   regular file
/// - `RunnerError::Io` for anything else, `NotFound` included
pub fn safe_open_readonly(path: &Path) -> Result<File> {
    ensure_absolute(path)?;
    walk_parents(path)?;

    let file = open_nofollow(path, OpenOptions::new().read(true))
        .map_err(|e| translate_open_error(e, path))?;
    ensure_regular(&file, path)?;
    Ok(file)
}

/// Reads an entire file through a symlink-resistant open, bounded by
/// `max_size`.
///
/// # Errors
///
/// All of [`safe_open_readonly`]'s errors, plus `RunnerError::FileTooLarge`
/// when the file exceeds `max_size` bytes.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vigil_core::safefs;
///
/// # fn main() -> vigil_core::Result<()> {
/// let bytes = safefs::safe_read(Path::new("/etc/hostname"), safefs::DEFAULT_MAX_READ_SIZE)?;
/// # Ok(())
/// # }
/// ```
pub fn safe_read(path: &Path, max_size: u64) -> Result<Vec<u8>> {
    let file = safe_open_readonly(path)?;

    let mut reader = LimitedReader::new(file, max_size);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    if reader.over_limit() {
        return Err(RunnerError::FileTooLarge {
            path: path.to_path_buf(),
            max_size,
        });
    }
    Ok(buf)
}

/// Creates `path` with exclusive-create semantics and writes `bytes` to it.
///
/// If any step after the create fails, the newly created file is unlinked
/// so a half-written file never survives. A failed unlink is logged and the
/// original error is surfaced.
///
/// # Errors
///
/// - `RunnerError::FileExists` when the file already exists
/// - the errors of [`safe_open_readonly`] for path problems
pub fn safe_write_new(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    ensure_absolute(path)?;
    walk_parents(path)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    apply_mode(&mut options, mode);
    let mut file = open_nofollow(path, &mut options).map_err(|e| translate_open_error(e, path))?;

    let result = ensure_regular(&file, path).and_then(|()| {
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    });

    if result.is_err() {
        if let Err(unlink_err) = std::fs::remove_file(path) {
            tracing::warn!(
                path = %path.display(),
                error = %unlink_err,
                "failed to unlink partially written file"
            );
        }
    }
    result
}

/// Replaces the content of an existing regular file with `bytes`.
///
/// Validation happens on the open descriptor before any truncation, so a
/// failed validation leaves the prior content intact. Nothing is unlinked
/// on failure.
///
/// # Errors
///
/// The errors of [`safe_open_readonly`]; `NotFound` if the file does not
/// exist.
pub fn safe_write_overwrite(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    ensure_absolute(path)?;
    walk_parents(path)?;

    let mut options = OpenOptions::new();
    options.read(true).write(true);
    apply_mode(&mut options, mode);
    let mut file = open_nofollow(path, &mut options).map_err(|e| translate_open_error(e, path))?;

    ensure_regular(&file, path)?;
    file.set_len(0)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

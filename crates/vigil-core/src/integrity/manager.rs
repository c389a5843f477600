//! Per-process verification gate.
//!
//! A `VerificationManager` is constructed once, validates the hash
//! directory it will trust, and then verifies files on demand before
//! anything sensitive runs. Production mode is strict; dry-run mode
//! downgrades missing records to warnings so planning can continue.

use std::path::Path;
use std::path::PathBuf;

use crate::RunnerError;
use crate::Result;
use crate::safefs;

use super::FileValidator;

/// Hash directory trusted by production managers.
///
/// Set at build time with the `VIGIL_HASH_DIR` environment variable;
/// read-only at runtime.
pub const DEFAULT_HASH_DIR: &str = match option_env!("VIGIL_HASH_DIR") {
    Some(dir) => dir,
    None => "/usr/local/etc/vigil/hashes",
};

/// Maximum permission bits tolerated on the hash directory.
const MAX_HASH_DIR_MODE: u32 = 0o755;

/// Verifies a known set of files before a run.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vigil_core::integrity::VerificationManager;
///
/// # fn main() -> vigil_core::Result<()> {
/// let manager = VerificationManager::new_production()?;
/// manager.verify_file(Path::new("/usr/local/bin/deploy.sh"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct VerificationManager {
    validator: FileValidator,
    is_dry_run: bool,
}

impl VerificationManager {
    /// Creates a production manager bound to [`DEFAULT_HASH_DIR`].
    ///
    /// The hash directory must exist, be a real directory (not a symlink),
    /// be owned by root or the effective user, keep its mode within 0o755,
    /// and belong to a group the running user is a member of.
    ///
    /// # Errors
    ///
    /// Any hash-directory validation failure.
    #[track_caller]
    pub fn new_production() -> Result<Self> {
        let caller = std::panic::Location::caller();
        validate_hash_dir(Path::new(DEFAULT_HASH_DIR))?;
        tracing::info!(
            hash_dir = DEFAULT_HASH_DIR,
            %caller,
            "verification manager created (production)"
        );
        Ok(Self {
            validator: FileValidator::new(DEFAULT_HASH_DIR),
            is_dry_run: false,
        })
    }

    /// Rejects a production manager with a non-default hash directory.
    ///
    /// Production verification only ever trusts the directory compiled into
    /// the binary; this constructor exists so callers holding a
    /// user-supplied override get a uniform, typed rejection.
    ///
    /// # Errors
    ///
    /// `RunnerError::ConfigValidationFailed` whenever `hash_dir` differs
    /// from [`DEFAULT_HASH_DIR`].
    #[track_caller]
    pub fn new_production_with_dir(hash_dir: &Path) -> Result<Self> {
        if hash_dir != Path::new(DEFAULT_HASH_DIR) {
            return Err(RunnerError::ConfigValidationFailed {
                reason: format!(
                    "custom hash directory {} is not permitted in production mode",
                    hash_dir.display()
                ),
            });
        }
        Self::new_production()
    }

    /// Creates a dry-run manager, skipping hash-directory validation.
    #[track_caller]
    #[must_use]
    pub fn new_for_dry_run() -> Self {
        let caller = std::panic::Location::caller();
        tracing::info!(
            hash_dir = DEFAULT_HASH_DIR,
            %caller,
            "verification manager created (dry-run)"
        );
        Self {
            validator: FileValidator::new(DEFAULT_HASH_DIR),
            is_dry_run: true,
        }
    }

    /// Creates a dry-run manager against an explicit hash directory.
    ///
    /// Only dry-run mode accepts an override; production is pinned to
    /// [`DEFAULT_HASH_DIR`].
    #[must_use]
    pub fn new_for_dry_run_with_dir(hash_dir: impl Into<PathBuf>) -> Self {
        Self {
            validator: FileValidator::new(hash_dir),
            is_dry_run: true,
        }
    }

    /// True when this manager was created for a dry run.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.is_dry_run
    }

    /// Returns the hash directory this manager trusts.
    #[must_use]
    pub fn hash_dir(&self) -> &Path {
        self.validator.hash_dir()
    }

    /// Verifies one file against its recorded digest.
    ///
    /// In dry-run mode a missing record is demoted to a warning; a digest
    /// mismatch is an error in both modes.
    ///
    /// # Errors
    ///
    /// `RunnerError::MissingHash` (production only),
    /// `RunnerError::HashMismatch`, or any underlying I/O failure.
    pub fn verify_file(&self, path: &Path) -> Result<()> {
        match self.validator.verify(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "file verified");
                Ok(())
            }
            Err(RunnerError::MissingHash { .. }) if self.is_dry_run => {
                tracing::warn!(
                    path = %path.display(),
                    "no hash record; continuing because this is a dry run"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Verifies files in the caller's order, stopping at the first error.
    ///
    /// Returns the number of files that verified.
    pub fn verify_files<I, P>(&self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut verified = 0;
        for path in paths {
            self.verify_file(path.as_ref())?;
            verified += 1;
        }
        Ok(verified)
    }

    /// Verifies `path` and then reads it through the symlink-resistant
    /// layer.
    pub fn read_and_verify(&self, path: &Path) -> Result<Vec<u8>> {
        self.verify_file(path)?;
        safefs::safe_read(path, safefs::DEFAULT_MAX_READ_SIZE)
    }
}

/// Validates the hash directory a production manager will trust.
#[cfg(unix)]
fn validate_hash_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let meta = match std::fs::symlink_metadata(dir) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RunnerError::InvalidFilePath {
                path: dir.to_path_buf(),
                reason: "hash directory does not exist".to_string(),
            });
        }
        Err(e) => return Err(RunnerError::Io(e)),
    };

    if meta.file_type().is_symlink() {
        return Err(RunnerError::IsSymlink {
            path: dir.to_path_buf(),
        });
    }
    if !meta.is_dir() {
        return Err(RunnerError::InvalidFilePath {
            path: dir.to_path_buf(),
            reason: "hash directory is not a directory".to_string(),
        });
    }

    let mode = meta.mode() & 0o7777;
    if mode & !MAX_HASH_DIR_MODE != 0 {
        return Err(RunnerError::InvalidPermissions {
            path: dir.to_path_buf(),
            mode,
            max_mode: MAX_HASH_DIR_MODE,
        });
    }

    let uid = meta.uid();
    if uid != 0 && uid != effective_uid() {
        return Err(RunnerError::UntrustedOwner {
            path: dir.to_path_buf(),
            uid,
        });
    }

    let gid = meta.gid();
    if gid != 0 && !caller_group_ids().contains(&gid) {
        return Err(RunnerError::UntrustedGroup {
            path: dir.to_path_buf(),
            gid,
        });
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_hash_dir(dir: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(dir).map_err(|_| RunnerError::InvalidFilePath {
        path: dir.to_path_buf(),
        reason: "hash directory does not exist".to_string(),
    })?;
    if !meta.is_dir() {
        return Err(RunnerError::InvalidFilePath {
            path: dir.to_path_buf(),
            reason: "hash directory is not a directory".to_string(),
        });
    }
    Ok(())
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn effective_uid() -> u32 {
    // SAFETY: geteuid is specified to always succeed and touches no memory.
    unsafe { libc::geteuid() }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn caller_group_ids() -> Vec<u32> {
    // SAFETY: getegid always succeeds. getgroups writes at most `len`
    // entries into a buffer of exactly `len` entries and returns the count
    // written, or -1 on failure, in which case only the effective gid is
    // used.
    unsafe {
        let mut buf = [0 as libc::gid_t; 256];
        let n = libc::getgroups(256, buf.as_mut_ptr());
        let mut ids: Vec<u32> = if n > 0 {
            buf[..usize::try_from(n).unwrap_or(0)]
                .iter()
                .map(|g| u32::try_from(*g).unwrap_or(u32::MAX))
                .collect()
        } else {
            Vec::new()
        };
        ids.push(libc::getegid());
        ids
    }
}

//! Digest recording and verification for individual files.

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use sha2::Digest;
use sha2::Sha256;

use crate::RunnerError;
use crate::Result;
use crate::safefs;

use super::encode_path;

/// File mode for newly written hash records.
const HASH_FILE_MODE: u32 = 0o640;

/// Streaming digest buffer size.
const DIGEST_BUF_SIZE: usize = 64 * 1024;

/// Records and verifies SHA-256 digests of files against a hash directory.
///
/// Each protected file has one record at `hash_dir/<encoded name>` holding
/// the lowercase hex digest as a single line. The hash directory itself is
/// validated by the verification manager, not here.
#[derive(Debug, Clone)]
pub struct FileValidator {
    hash_dir: PathBuf,
}

impl FileValidator {
    /// Creates a validator rooted at `hash_dir`.
    #[must_use]
    pub fn new(hash_dir: impl Into<PathBuf>) -> Self {
        Self {
            hash_dir: hash_dir.into(),
        }
    }

    /// Returns the hash directory this validator reads and writes.
    #[must_use]
    pub fn hash_dir(&self) -> &Path {
        &self.hash_dir
    }

    /// Computes the hash-record location for `path`.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::InvalidFilePath` for non-UTF-8 paths and the
    /// encoder's `InvalidPath` for paths it cannot represent.
    pub fn record_path(&self, path: &Path) -> Result<PathBuf> {
        let text = path.to_str().ok_or_else(|| RunnerError::InvalidFilePath {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        let name = encode_path(text)?;
        Ok(self.hash_dir.join(name))
    }

    /// Computes the streaming SHA-256 digest of `path` as lowercase hex.
    ///
    /// The file is opened through the symlink-resistant layer and read in
    /// fixed-size chunks, so arbitrarily large files digest without
    /// buffering them whole.
    pub fn compute_digest(&self, path: &Path) -> Result<String> {
        let mut file = safefs::safe_open_readonly(path)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; DIGEST_BUF_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Records the digest of `path`, returning the encoded record name.
    ///
    /// With `force` false an existing record is an error; with `force` true
    /// it is replaced in place.
    ///
    /// # Errors
    ///
    /// `RunnerError::FileExists` when a record exists and `force` is false,
    /// plus any digest or write failure.
    pub fn record(&self, path: &Path, force: bool) -> Result<String> {
        let record_path = self.record_path(path)?;
        let digest = self.compute_digest(path)?;
        let content = format!("{digest}\n");

        match safefs::safe_write_new(&record_path, content.as_bytes(), HASH_FILE_MODE) {
            Ok(()) => {}
            Err(RunnerError::FileExists { .. }) if force => {
                safefs::safe_write_overwrite(&record_path, content.as_bytes(), HASH_FILE_MODE)?;
            }
            Err(e) => return Err(e),
        }

        let name = record_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(name)
    }

    /// Verifies that `path` still matches its recorded digest.
    ///
    /// # Errors
    ///
    /// - `RunnerError::MissingHash` when no record exists
    /// - `RunnerError::HashMismatch` when the digests differ
    /// - any underlying I/O error otherwise
    pub fn verify(&self, path: &Path) -> Result<()> {
        let record_path = self.record_path(path)?;
        let recorded = match safefs::safe_read(&record_path, safefs::DEFAULT_MAX_READ_SIZE) {
            Ok(bytes) => bytes,
            Err(RunnerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RunnerError::MissingHash {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e),
        };

        let expected = String::from_utf8_lossy(&recorded).trim().to_string();
        let actual = self.compute_digest(path)?;
        if expected != actual {
            return Err(RunnerError::HashMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

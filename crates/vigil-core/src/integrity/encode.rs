//! Reversible path-to-filename encoding with a hash fallback.
//!
//! A hash record for `/usr/bin/python3` lives in a flat hash directory, so
//! the absolute path must collapse into a single filename. The normal
//! encoding is bijective and human-readable; paths whose encoding would
//! exceed the filename length cap degrade to a stable SHA-256 fallback that
//! is not reversible.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::Digest;
use sha2::Sha256;

use crate::RunnerError;
use crate::Result;

/// Maximum encoded filename length in bytes.
///
/// Stays under the typical filesystem `NAME_MAX` of 255 with headroom for
/// suffixes.
pub const MAX_FILENAME_LENGTH: usize = 250;

/// Number of base64url characters kept from the fallback digest.
const FALLBACK_PREFIX_LEN: usize = 12;

/// Suffix appended to fallback encodings.
const FALLBACK_SUFFIX: &str = ".json";

/// Rejects inputs the encoder cannot represent bijectively.
fn ensure_encodable(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(RunnerError::InvalidPath {
            path: path.to_string(),
            reason: "path is empty".to_string(),
        });
    }
    if !path.starts_with('/') {
        return Err(RunnerError::InvalidPath {
            path: path.to_string(),
            reason: "path is not absolute".to_string(),
        });
    }
    if path != "/" {
        for segment in path[1..].split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(RunnerError::InvalidPath {
                    path: path.to_string(),
                    reason: "path is not normalized".to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Encodes an absolute, normalized path into a single filename.
///
/// The transformation is a single pass: `/` becomes `~`, `~` becomes `##`,
/// `#` becomes `#1`, everything else is copied unchanged. When the result
/// fits within [`MAX_FILENAME_LENGTH`] it is returned as-is (a "normal"
/// encoding, always starting with `~`). Longer results are replaced by the
/// first twelve base64url characters of the path's SHA-256 digest plus
/// `.json` (a "fallback" encoding, never reversible).
///
/// # Errors
///
/// Returns `RunnerError::InvalidPath` for empty, relative, or
/// non-normalized input.
///
/// # Examples
///
/// ```
/// use vigil_core::integrity::encode_path;
///
/// assert_eq!(encode_path("/usr/bin/python3")?, "~usr~bin~python3");
/// assert_eq!(encode_path("/home/user#test/file")?, "~home~user#1test~file");
/// # Ok::<(), vigil_core::RunnerError>(())
/// ```
pub fn encode_path(path: &str) -> Result<String> {
    ensure_encodable(path)?;

    let mut encoded = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        match c {
            '/' => encoded.push('~'),
            '~' => encoded.push_str("##"),
            '#' => encoded.push_str("#1"),
            other => encoded.push(other),
        }
    }

    if encoded.len() <= MAX_FILENAME_LENGTH {
        return Ok(encoded);
    }

    let digest = Sha256::digest(path.as_bytes());
    let mut name = URL_SAFE_NO_PAD.encode(digest);
    name.truncate(FALLBACK_PREFIX_LEN);
    name.push_str(FALLBACK_SUFFIX);
    Ok(name)
}

/// Decodes a normal encoding back into the original absolute path.
///
/// Empty input decodes to the empty path. Fallback encodings (anything not
/// starting with `~`) return `RunnerError::FallbackNotReversible`. A stray
/// `#` that is not part of a `##` or `#1` escape marks the name as
/// corrupted and returns `RunnerError::InvalidEncodedName`.
///
/// # Examples
///
/// ```
/// use vigil_core::integrity::decode_name;
///
/// assert_eq!(decode_name("~usr~bin~python3")?, "/usr/bin/python3");
/// # Ok::<(), vigil_core::RunnerError>(())
/// ```
pub fn decode_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Ok(String::new());
    }
    if !is_normal(name) {
        return Err(RunnerError::FallbackNotReversible {
            name: name.to_string(),
        });
    }

    let mut decoded = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        match c {
            '~' => decoded.push('/'),
            '#' => match chars.next() {
                Some('#') => decoded.push('~'),
                Some('1') => decoded.push('#'),
                _ => {
                    return Err(RunnerError::InvalidEncodedName {
                        name: name.to_string(),
                    });
                }
            },
            other => decoded.push(other),
        }
    }
    Ok(decoded)
}

/// True when `name` is a normal (reversible) encoding.
#[must_use]
pub fn is_normal(name: &str) -> bool {
    name.as_bytes().first() == Some(&b'~')
}

/// True when `name` is a hash fallback encoding.
#[must_use]
pub fn is_fallback(name: &str) -> bool {
    !name.is_empty() && !is_normal(name)
}

//! Configuration and env-file loading.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use vigil_core::ConfigSpec;
use vigil_core::env::validate_name;
use vigil_core::safefs;

use crate::error::convert_runner_error;

/// Parses and validates a configuration from raw TOML bytes.
pub fn parse_config(bytes: &[u8], origin: &Path) -> Result<ConfigSpec> {
    let text = std::str::from_utf8(bytes)
        .with_context(|| format!("configuration '{}' is not UTF-8", origin.display()))?;
    let spec: ConfigSpec = toml::from_str(text)
        .with_context(|| format!("configuration '{}' is not valid TOML", origin.display()))?;
    spec.validate()
        .map_err(|e| convert_runner_error(e, origin))?;
    Ok(spec)
}

/// Loads a configuration file through the symlink-resistant layer.
pub fn load_config(path: &Path) -> Result<ConfigSpec> {
    let absolute = absolutize(path)?;
    let bytes = safefs::safe_read(&absolute, safefs::DEFAULT_MAX_READ_SIZE)
        .map_err(|e| convert_runner_error(e, path))?;
    parse_config(&bytes, path)
}

/// Loads a configuration file after verifying it against its hash record.
///
/// In dry-run managers a missing record is a warning; a wrong digest is
/// fatal in both modes.
pub fn load_config_verified(
    path: &Path,
    manager: &vigil_core::VerificationManager,
) -> Result<ConfigSpec> {
    let absolute = absolutize(path)?;
    let bytes = manager
        .read_and_verify(&absolute)
        .map_err(|e| convert_runner_error(e, path))?;
    parse_config(&bytes, path)
}

/// Loads a `KEY=VALUE` env file.
///
/// Blank lines and `#` comments are skipped. Values are screened later by
/// the environment filter; this only checks the shape.
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let absolute = absolutize(path)?;
    let bytes = safefs::safe_read(&absolute, safefs::DEFAULT_MAX_READ_SIZE)
        .map_err(|e| convert_runner_error(e, path))?;
    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("env file '{}' is not UTF-8", path.display()))?;

    let mut entries = BTreeMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, value) = line.split_once('=').with_context(|| {
            format!(
                "env file '{}' line {}: expected KEY=VALUE",
                path.display(),
                lineno + 1
            )
        })?;
        validate_name(name).map_err(|e| convert_runner_error(e, path))?;
        entries.insert(name.to_string(), value.to_string());
    }
    Ok(entries)
}

/// Anchors a possibly relative CLI path at the current directory.
pub(crate) fn absolutize(path: &Path) -> Result<std::path::PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    Ok(cwd.join(path))
}

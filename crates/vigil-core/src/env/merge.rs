//! Group environment resolution.

use std::collections::BTreeMap;

use crate::RunnerError;
use crate::Result;
use crate::config::GroupSpec;

use super::EnvironmentFilter;
use super::validate_name;
use super::validate_value;

/// Splits a `KEY=VALUE` entry, validating the key.
///
/// # Errors
///
/// `RunnerError::ConfigValidationFailed` for entries without `=`, and
/// `RunnerError::InvalidVariableName` for malformed keys.
pub fn split_env_entry(entry: &str) -> Result<(&str, &str)> {
    let (name, value) = entry
        .split_once('=')
        .ok_or_else(|| RunnerError::ConfigValidationFailed {
            reason: format!("environment entry is not KEY=VALUE: {entry:?}"),
        })?;
    validate_name(name)?;
    Ok((name, value))
}

/// Resolves the final environment for a group.
///
/// Merge order is system (filtered) < env-file (filtered) < group `env`
/// entries; later layers win. Every merged entry passes name and value
/// validation; a dangerous value anywhere aborts the merge.
///
/// # Errors
///
/// `RunnerError::UnsafeEnvVar` for dangerous values,
/// `RunnerError::InvalidVariableName` for malformed names, and
/// `RunnerError::ConfigValidationFailed` for entries without `=`.
pub fn resolve_group_env(
    filter: &EnvironmentFilter,
    group: &GroupSpec,
    env_file: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let system = filter.filter_system_env(group.env_allowlist.as_deref());
    resolve_group_env_from(filter, group, system, env_file)
}

/// Injectable counterpart of [`resolve_group_env`] taking the system
/// environment as a snapshot.
pub fn resolve_group_env_from(
    filter: &EnvironmentFilter,
    group: &GroupSpec,
    system_env: BTreeMap<String, String>,
    env_file: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let allowlist = group.env_allowlist.as_deref();

    let mut merged = filter.filter_env_map(system_env, allowlist);
    merged.extend(filter.filter_env_file(env_file, allowlist)?);

    for entry in &group.env {
        let (name, value) = split_env_entry(entry)?;
        validate_value(name, value)?;
        merged.insert(name.to_string(), value.to_string());
    }

    for (name, value) in &merged {
        validate_name(name)?;
        validate_value(name, value)?;
    }

    Ok(merged)
}

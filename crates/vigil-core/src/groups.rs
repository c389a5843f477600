//! Group selection by name.

use crate::RunnerError;
use crate::Result;
use crate::config::ConfigSpec;

/// Parses a comma-separated group flag into names.
///
/// Entries are trimmed; empty entries are dropped.
///
/// # Examples
///
/// ```
/// use vigil_core::groups::parse_group_names;
///
/// assert_eq!(parse_group_names("build, deploy ,,"), vec!["build", "deploy"]);
/// assert!(parse_group_names("").is_empty());
/// ```
#[must_use]
pub fn parse_group_names(flag: &str) -> Vec<String> {
    flag.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Selects groups by name against a configuration.
///
/// Empty input selects every group in declaration order. Otherwise each
/// requested name must exist; the result keeps the request order with
/// duplicate requests collapsed to their first occurrence.
///
/// # Errors
///
/// - `RunnerError::NilConfig` when no configuration is supplied
/// - `RunnerError::GroupNotFound` listing the deduplicated missing names
///   and every available group name
pub fn filter_groups(names: &[String], config: Option<&ConfigSpec>) -> Result<Vec<String>> {
    let config = config.ok_or(RunnerError::NilConfig)?;

    if names.is_empty() {
        return Ok(config.groups.iter().map(|g| g.name.clone()).collect());
    }

    let mut selected = Vec::new();
    let mut missing = Vec::new();
    for name in names {
        if config.group(name).is_none() {
            if !missing.contains(name) {
                missing.push(name.clone());
            }
        } else if !selected.contains(name) {
            selected.push(name.clone());
        }
    }

    if !missing.is_empty() {
        let mut available = Vec::new();
        for group in &config.groups {
            if !available.contains(&group.name) {
                available.push(group.name.clone());
            }
        }
        return Err(RunnerError::GroupNotFound { missing, available });
    }
    Ok(selected)
}

//! Error conversion utilities for CLI.
//!
//! Converts vigil-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use vigil_core::RunnerError;

/// Converts `RunnerError` to a user-friendly anyhow error with context
pub fn convert_runner_error(err: RunnerError, config: &Path) -> anyhow::Error {
    match err {
        RunnerError::HashMismatch {
            path,
            expected,
            actual,
        } => {
            anyhow!(
                "Integrity failure: '{}' does not match its recorded digest\n\
                 Recorded: {expected}\n\
                 Current:  {actual}\n\
                 HINT: If the change is expected, re-record with 'vigil record --force'.",
                path.display()
            )
        }
        RunnerError::MissingHash { path } => {
            anyhow!(
                "No hash record for '{}'\n\
                 HINT: Record it first with 'vigil record', or plan with --dry-run.",
                path.display()
            )
        }
        RunnerError::IsSymlink { path } => {
            anyhow!(
                "Refusing to traverse symlink at '{}'\n\
                 HINT: Protected files and hash records must be reachable without symlinks.",
                path.display()
            )
        }
        RunnerError::UnsafeEnvVar { name, pattern } => {
            anyhow!(
                "Environment variable '{name}' carries a dangerous value (matched {pattern:?})\n\
                 HINT: Shell metacharacters are not allowed in runner environments."
            )
        }
        RunnerError::RiskLimitExceeded {
            command,
            level,
            max,
        } => {
            anyhow!(
                "Command '{command}' is {level} risk, above the configured {max} limit\n\
                 HINT: Raise the ceiling with --max-risk if this is intended."
            )
        }
        RunnerError::GroupNotFound { missing, available } => {
            anyhow!(
                "Unknown group(s): {}\n\
                 Available groups: {}",
                missing.join(", "),
                available.join(", ")
            )
        }
        RunnerError::ConfigValidationFailed { reason } => {
            anyhow!(
                "Configuration '{}' failed validation: {reason}",
                config.display()
            )
        }
        RunnerError::CircularReference { name } => {
            anyhow!(
                "Variable expansion loops through '{name}'\n\
                 HINT: Break the reference cycle in the configuration's variables."
            )
        }
        RunnerError::CircularDependency { name } => {
            anyhow!(
                "Template variables loop through '{name}'\n\
                 HINT: Break the reference cycle in the template's variables."
            )
        }
        RunnerError::VariableNotAllowed { name } => {
            anyhow!(
                "Environment variable '{name}' is not in the allowlist\n\
                 HINT: Add it to env_allowlist in '{}' if it should cross the boundary.",
                config.display()
            )
        }
        other => anyhow!(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_hash_mismatch_hint() {
        let err = RunnerError::HashMismatch {
            path: PathBuf::from("/srv/tool.sh"),
            expected: "aa".repeat(32),
            actual: "bb".repeat(32),
        };
        let converted = convert_runner_error(err, Path::new("config.toml"));
        let text = converted.to_string();
        assert!(text.contains("/srv/tool.sh"));
        assert!(text.contains("HINT"));
    }

    #[test]
    fn test_group_not_found_lists_available() {
        let err = RunnerError::GroupNotFound {
            missing: vec!["x".to_string()],
            available: vec!["build".to_string(), "deploy".to_string()],
        };
        let converted = convert_runner_error(err, Path::new("config.toml"));
        assert!(converted.to_string().contains("build, deploy"));
    }

    #[test]
    fn test_passthrough_keeps_message() {
        let err = RunnerError::NilConfig;
        let converted = convert_runner_error(err, Path::new("config.toml"));
        assert!(converted.to_string().contains("no configuration loaded"));
    }
}

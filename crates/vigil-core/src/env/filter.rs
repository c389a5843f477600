//! Environment allowlist enforcement and value screening.

use std::collections::BTreeMap;

use crate::RunnerError;
use crate::Result;
use crate::config::is_valid_identifier;

/// Substrings that disqualify an environment value.
///
/// Matching is case-sensitive substring search. False positives (an HTML
/// snippet tripping on `<`) are accepted; these values feed shells and
/// service managers, so the screen errs on rejection.
pub const DANGEROUS_PATTERNS: &[&str] = &[
    ";", "&&", "||", "|", "$(", "`", "<", ">", "rm ", "del ", "format ", "mkfs ", "mkfs.",
    "dd if=", "dd of=", "exec ", "exec(", "system ", "system(", "eval ", "eval(",
];

/// Constrains which environment variables cross the trust boundary.
///
/// Holds the immutable process-wide allowlist; per-group allowlists are
/// passed per call. A group allowlist that is present, even empty, is used
/// exclusively; an absent one inherits the global list.
#[derive(Debug, Clone)]
pub struct EnvironmentFilter {
    global_allowlist: Vec<String>,
}

impl EnvironmentFilter {
    /// Creates a filter over the process-wide allowlist.
    #[must_use]
    pub fn new(global_allowlist: &[String]) -> Self {
        Self {
            global_allowlist: global_allowlist.to_vec(),
        }
    }

    /// Resolves the allowlist in effect for a group.
    ///
    /// Present (including empty) overrides; absent inherits the global.
    #[must_use]
    pub fn resolved_allowlist<'a>(&'a self, group_allowlist: Option<&'a [String]>) -> &'a [String] {
        group_allowlist.unwrap_or(&self.global_allowlist)
    }

    /// Filters the process environment through the resolved allowlist.
    #[must_use]
    pub fn filter_system_env(
        &self,
        group_allowlist: Option<&[String]>,
    ) -> BTreeMap<String, String> {
        self.filter_env_map(std::env::vars().collect(), group_allowlist)
    }

    /// Filters an arbitrary environment map through the resolved allowlist.
    ///
    /// Injectable counterpart of [`EnvironmentFilter::filter_system_env`]
    /// for callers that already hold a snapshot.
    #[must_use]
    pub fn filter_env_map(
        &self,
        env: BTreeMap<String, String>,
        group_allowlist: Option<&[String]>,
    ) -> BTreeMap<String, String> {
        let allowlist = self.resolved_allowlist(group_allowlist);
        env.into_iter()
            .filter(|(name, _)| allowlist.iter().any(|allowed| allowed == name))
            .collect()
    }

    /// Validates and filters entries loaded from an env file.
    ///
    /// The whole call fails on the first invalid name or dangerous value;
    /// otherwise the allowlist is applied and the surviving entries are
    /// returned.
    ///
    /// # Errors
    ///
    /// `RunnerError::InvalidVariableName` or `RunnerError::UnsafeEnvVar`.
    pub fn filter_env_file(
        &self,
        env: &BTreeMap<String, String>,
        group_allowlist: Option<&[String]>,
    ) -> Result<BTreeMap<String, String>> {
        for (name, value) in env {
            validate_name(name)?;
            validate_value(name, value)?;
        }
        Ok(self.filter_env_map(env.clone(), group_allowlist))
    }
}

/// Validates an environment variable name: `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Errors
///
/// `RunnerError::InvalidVariableName`, with the empty name reported the
/// same way.
pub fn validate_name(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(RunnerError::InvalidVariableName {
            name: name.to_string(),
        })
    }
}

/// Screens an environment value against [`DANGEROUS_PATTERNS`].
///
/// # Errors
///
/// `RunnerError::UnsafeEnvVar` naming the first pattern that matched.
pub fn validate_value(name: &str, value: &str) -> Result<()> {
    for pattern in DANGEROUS_PATTERNS {
        if value.contains(pattern) {
            return Err(RunnerError::UnsafeEnvVar {
                name: name.to_string(),
                pattern: (*pattern).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_global_allowlist_applies() {
        let filter = EnvironmentFilter::new(&list(&["PATH", "HOME"]));
        let env = map(&[("PATH", "/usr/bin"), ("HOME", "/root"), ("SECRET", "x")]);

        let filtered = filter.filter_env_map(env, None);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("PATH"));
        assert!(filtered.contains_key("HOME"));
        assert!(!filtered.contains_key("SECRET"));
    }

    #[test]
    fn test_group_allowlist_overrides_global() {
        let filter = EnvironmentFilter::new(&list(&["PATH", "HOME"]));
        let env = map(&[("PATH", "/usr/bin"), ("HOME", "/root"), ("LANG", "C")]);

        let group = list(&["LANG"]);
        let filtered = filter.filter_env_map(env, Some(&group));
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("LANG"));
        assert!(!filtered.contains_key("PATH"));
    }

    #[test]
    fn test_empty_group_allowlist_rejects_everything() {
        let filter = EnvironmentFilter::new(&list(&["PATH"]));
        let env = map(&[("PATH", "/usr/bin")]);

        let filtered = filter.filter_env_map(env, Some(&[]));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_absent_group_allowlist_inherits() {
        let filter = EnvironmentFilter::new(&list(&["PATH"]));
        assert_eq!(filter.resolved_allowlist(None), &["PATH".to_string()][..]);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("PATH").is_ok());
        assert!(validate_name("_private").is_ok());
        assert!(validate_name("lower_case").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1BAD").is_err());
        assert!(validate_name("WITH-DASH").is_err());
    }

    #[test]
    fn test_validate_value_command_injection() {
        let result = validate_value("V", "value$(rm -rf /)");
        assert!(matches!(result, Err(RunnerError::UnsafeEnvVar { .. })));
    }

    #[test]
    fn test_validate_value_accepted_false_positive() {
        // HTML trips the redirect screen; rejection is the documented
        // behavior.
        assert!(matches!(
            validate_value("V", "<div></div>"),
            Err(RunnerError::UnsafeEnvVar { .. })
        ));
    }

    #[test]
    fn test_validate_value_each_pattern() {
        for pattern in DANGEROUS_PATTERNS {
            let value = format!("prefix {pattern} suffix");
            assert!(
                matches!(
                    validate_value("V", &value),
                    Err(RunnerError::UnsafeEnvVar { .. })
                ),
                "pattern: {pattern}"
            );
        }
    }

    #[test]
    fn test_validate_value_case_sensitive() {
        // "RM " is not "rm "; matching is case-sensitive.
        assert!(validate_value("V", "RM something").is_ok());
        assert!(validate_value("V", "format-checker").is_ok());
        assert!(validate_value("V", "plain value").is_ok());
    }

    #[test]
    fn test_filter_env_file_rejects_whole_call() {
        let filter = EnvironmentFilter::new(&list(&["GOOD", "BAD"]));
        let env = map(&[("GOOD", "fine"), ("BAD", "a;b")]);

        assert!(matches!(
            filter.filter_env_file(&env, None),
            Err(RunnerError::UnsafeEnvVar { .. })
        ));
    }

    #[test]
    fn test_filter_env_file_applies_allowlist() {
        let filter = EnvironmentFilter::new(&list(&["KEEP"]));
        let env = map(&[("KEEP", "yes"), ("DROP", "no")]);

        let filtered = filter.filter_env_file(&env, None).unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("KEEP"));
    }

    #[test]
    fn test_filter_env_file_validates_dropped_entries_too() {
        // Validation covers every entry, allowlisted or not.
        let filter = EnvironmentFilter::new(&list(&["KEEP"]));
        let env = map(&[("KEEP", "yes"), ("DROP", "rm -rf /tmp")]);

        assert!(filter.filter_env_file(&env, None).is_err());
    }
}

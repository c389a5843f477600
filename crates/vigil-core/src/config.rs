//! Declarative run configuration data model.
//!
//! A `ConfigSpec` is produced by an external loader, validated once, and
//! then borrowed read-only by every core component. Nothing in this module
//! performs I/O.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::template::Template;

/// Top-level immutable description of a run.
///
/// # Invariants
///
/// After `validate()` succeeds:
/// - group names are unique across the spec,
/// - every group name is a valid identifier (`[A-Za-z_][A-Za-z0-9_]*`),
/// - every global allowlist entry is an uppercase identifier.
///
/// # Examples
///
/// ```
/// use vigil_core::config::ConfigSpec;
///
/// let spec: ConfigSpec = toml::from_str(
///     r#"
///     version = "1.0"
///
///     [global]
///     env_allowlist = ["PATH", "HOME"]
///
///     [[groups]]
///     name = "build"
///     [[groups.commands]]
///     name = "compile"
///     cmd = "make"
///     args = ["all"]
///     "#,
/// )
/// .unwrap();
/// spec.validate().unwrap();
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigSpec {
    /// Schema version string. Required.
    pub version: String,

    /// Process-wide settings.
    #[serde(default)]
    pub global: GlobalSpec,

    /// Global variables, registered into the variable registry at load.
    /// Names must resolve to the global (uppercase-initial) namespace.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Template definitions available to groups.
    #[serde(default)]
    pub templates: Vec<Template>,

    /// Command groups in declaration order.
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// Process-wide settings shared by all groups.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GlobalSpec {
    /// Log level name passed through to the logging layer.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Ordered sequence of environment variable names allowed to cross the
    /// trust boundary. Entries must be unique uppercase identifiers.
    #[serde(default)]
    pub env_allowlist: Vec<String>,

    /// Files whose digests must verify before anything sensitive runs.
    #[serde(default)]
    pub verify_files: Vec<String>,
}

/// A named group of commands sharing environment settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GroupSpec {
    /// Group name. Must be a unique, valid identifier.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Per-group allowlist. `None` inherits the global allowlist; an empty
    /// list rejects every environment variable.
    #[serde(default)]
    pub env_allowlist: Option<Vec<String>>,

    /// Ordered `KEY=VALUE` entries applied on top of the filtered
    /// environment.
    #[serde(default)]
    pub env: Vec<String>,

    /// Local variables for this group. Names must resolve to the local
    /// (lowercase-initial) namespace.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Template to apply to this group, if any.
    #[serde(default)]
    pub template: Option<String>,

    /// Commands in execution order.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// A single command within a group.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommandSpec {
    /// Command name. Must be non-empty.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Executable to run. Must be non-empty.
    pub cmd: String,

    /// Arguments in order.
    #[serde(default)]
    pub args: Vec<String>,

    /// Ordered `KEY=VALUE` entries private to this command.
    #[serde(default)]
    pub env: Vec<String>,

    /// Working directory. Empty means unset.
    #[serde(default)]
    pub dir: String,

    /// Whether the command requires elevated privileges.
    #[serde(default)]
    pub privileged: bool,

    /// Timeout in seconds, honored by the executor.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Maximum captured output size in bytes, honored by the executor.
    #[serde(default)]
    pub output_size_limit: Option<u64>,
}

/// Checks that a name is a valid identifier: `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks that a name is a valid uppercase identifier: `[A-Z_][A-Z0-9_]*`.
#[must_use]
pub fn is_uppercase_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl ConfigSpec {
    /// Validates the spec-level invariants.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::ConfigValidationFailed` naming the first
    /// violation: empty version, duplicate or invalid group name, invalid
    /// or duplicate allowlist entry, or a command with an empty name or
    /// executable.
    pub fn validate(&self) -> crate::Result<()> {
        if self.version.is_empty() {
            return Err(validation_error("version must not be empty"));
        }

        let mut seen_allowlist = std::collections::HashSet::new();
        for entry in &self.global.env_allowlist {
            if !is_uppercase_identifier(entry) {
                return Err(validation_error(format!(
                    "global env_allowlist entry is not an uppercase identifier: {entry:?}"
                )));
            }
            if !seen_allowlist.insert(entry.as_str()) {
                return Err(validation_error(format!(
                    "duplicate global env_allowlist entry: {entry}"
                )));
            }
        }

        let mut seen_templates = std::collections::HashSet::new();
        for template in &self.templates {
            if !is_valid_identifier(&template.name) {
                return Err(validation_error(format!(
                    "template name is not a valid identifier: {:?}",
                    template.name
                )));
            }
            if !seen_templates.insert(template.name.as_str()) {
                return Err(validation_error(format!(
                    "duplicate template name: {}",
                    template.name
                )));
            }
        }

        let mut seen_groups = std::collections::HashSet::new();
        for group in &self.groups {
            if !is_valid_identifier(&group.name) {
                return Err(validation_error(format!(
                    "group name is not a valid identifier: {:?}",
                    group.name
                )));
            }
            if !seen_groups.insert(group.name.as_str()) {
                return Err(validation_error(format!(
                    "duplicate group name: {}",
                    group.name
                )));
            }
            if let Some(template) = &group.template
                && !seen_templates.contains(template.as_str())
            {
                return Err(validation_error(format!(
                    "group {} references unknown template {}",
                    group.name, template
                )));
            }
            for command in &group.commands {
                if command.name.is_empty() {
                    return Err(validation_error(format!(
                        "command in group {} has an empty name",
                        group.name
                    )));
                }
                if command.cmd.is_empty() {
                    return Err(validation_error(format!(
                        "command {} in group {} has an empty executable",
                        command.name, group.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|g| g.name == name)
    }
}

fn validation_error(reason: impl Into<String>) -> crate::RunnerError {
    crate::RunnerError::ConfigValidationFailed {
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn minimal_spec() -> ConfigSpec {
        ConfigSpec {
            version: "1.0".to_string(),
            global: GlobalSpec::default(),
            variables: BTreeMap::new(),
            templates: Vec::new(),
            groups: Vec::new(),
        }
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("build"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("Group7"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("7group"));
        assert!(!is_valid_identifier("has-dash"));
        assert!(!is_valid_identifier("has space"));
    }

    #[test]
    fn test_is_uppercase_identifier() {
        assert!(is_uppercase_identifier("PATH"));
        assert!(is_uppercase_identifier("LD_LIBRARY_PATH"));
        assert!(is_uppercase_identifier("_HIDDEN"));
        assert!(!is_uppercase_identifier("Path"));
        assert!(!is_uppercase_identifier("1PATH"));
        assert!(!is_uppercase_identifier(""));
    }

    #[test]
    fn test_validate_minimal() {
        assert!(minimal_spec().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let mut spec = minimal_spec();
        spec.version = String::new();
        assert!(matches!(
            spec.validate(),
            Err(crate::RunnerError::ConfigValidationFailed { .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_group() {
        let mut spec = minimal_spec();
        spec.groups = vec![
            GroupSpec {
                name: "build".to_string(),
                ..GroupSpec::default()
            },
            GroupSpec {
                name: "build".to_string(),
                ..GroupSpec::default()
            },
        ];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate group name"));
    }

    #[test]
    fn test_validate_bad_group_name() {
        let mut spec = minimal_spec();
        spec.groups = vec![GroupSpec {
            name: "not valid".to_string(),
            ..GroupSpec::default()
        }];
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_lowercase_allowlist_entry() {
        let mut spec = minimal_spec();
        spec.global.env_allowlist = vec!["Path".to_string()];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("uppercase identifier"));
    }

    #[test]
    fn test_validate_duplicate_allowlist_entry() {
        let mut spec = minimal_spec();
        spec.global.env_allowlist = vec!["PATH".to_string(), "PATH".to_string()];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_empty_command_fields() {
        let mut spec = minimal_spec();
        spec.groups = vec![GroupSpec {
            name: "build".to_string(),
            commands: vec![CommandSpec {
                name: "compile".to_string(),
                cmd: String::new(),
                ..CommandSpec::default()
            }],
            ..GroupSpec::default()
        }];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("empty executable"));
    }

    #[test]
    fn test_validate_unknown_template_reference() {
        let mut spec = minimal_spec();
        spec.groups = vec![GroupSpec {
            name: "build".to_string(),
            template: Some("absent".to_string()),
            ..GroupSpec::default()
        }];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("unknown template"));
    }

    #[test]
    fn test_validate_duplicate_template() {
        let mut spec = minimal_spec();
        spec.templates = vec![
            crate::template::Template {
                name: "t".to_string(),
                ..crate::template::Template::default()
            },
            crate::template::Template {
                name: "t".to_string(),
                ..crate::template::Template::default()
            },
        ];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate template name"));
    }

    #[test]
    fn test_group_lookup() {
        let mut spec = minimal_spec();
        spec.groups = vec![GroupSpec {
            name: "deploy".to_string(),
            ..GroupSpec::default()
        }];
        assert!(spec.group("deploy").is_some());
        assert!(spec.group("missing").is_none());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_text = r#"
            version = "1.0"

            [global]
            env_allowlist = ["PATH"]

            [[groups]]
            name = "build"
            description = "build the project"
            env = ["CC=gcc"]

            [[groups.commands]]
            name = "compile"
            cmd = "make"
            args = ["-j4", "all"]
            timeout = 600
        "#;
        let spec: ConfigSpec = toml::from_str(toml_text).unwrap();
        assert_eq!(spec.groups.len(), 1);
        assert_eq!(spec.groups[0].commands[0].args, vec!["-j4", "all"]);
        assert_eq!(spec.groups[0].commands[0].timeout, Some(600));
        spec.validate().unwrap();
    }
}

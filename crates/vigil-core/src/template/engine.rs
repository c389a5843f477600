//! Named templates applied to groups and commands.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::RunnerError;
use crate::Result;
use crate::config::GroupSpec;

use super::parse::expand_template_string;
use super::parse::template_refs;

/// Working-directory value carried through to the executor, which swaps it
/// for a per-run temporary directory.
pub const TEMP_DIR_SENTINEL: &str = "{{.temp_dir}}";

/// `work_dir` value requesting the temporary-directory sentinel.
const WORK_DIR_AUTO: &str = "auto";

/// A named, declarative template merged into groups at plan time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Template {
    /// Template name. Must be a valid identifier.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Whether commands under this template run in a temporary directory.
    #[serde(default)]
    pub temp_dir: bool,

    /// Whether the temporary directory is removed afterwards.
    #[serde(default)]
    pub cleanup: bool,

    /// Working directory assigned to commands that declare none. The value
    /// `auto` combined with `temp_dir` produces the temporary-directory
    /// sentinel.
    #[serde(default)]
    pub work_dir: String,

    /// Whether commands under this template are privileged.
    #[serde(default)]
    pub privileged: bool,

    /// Template-local variables. Values may reference other template
    /// variables with `{{.name}}`.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Registry of templates plus the engine-wide variables they merge over.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use vigil_core::template::Template;
/// use vigil_core::template::TemplateEngine;
///
/// let mut engine = TemplateEngine::new(BTreeMap::new());
/// engine.register(Template {
///     name: "quick".to_string(),
///     ..Template::default()
/// })?;
/// assert_eq!(engine.list(), vec!["quick".to_string()]);
/// # Ok::<(), vigil_core::RunnerError>(())
/// ```
#[derive(Debug, Default)]
pub struct TemplateEngine {
    templates: BTreeMap<String, Template>,
    globals: BTreeMap<String, String>,
}

impl TemplateEngine {
    /// Creates an engine with the given engine-wide variables.
    #[must_use]
    pub fn new(globals: BTreeMap<String, String>) -> Self {
        Self {
            templates: BTreeMap::new(),
            globals,
        }
    }

    /// Registers a template under its own name.
    ///
    /// # Errors
    ///
    /// `RunnerError::ConfigValidationFailed` for an invalid identifier or a
    /// duplicate name.
    pub fn register(&mut self, template: Template) -> Result<()> {
        if !crate::config::is_valid_identifier(&template.name) {
            return Err(RunnerError::ConfigValidationFailed {
                reason: format!("template name is not a valid identifier: {:?}", template.name),
            });
        }
        if self.templates.contains_key(&template.name) {
            return Err(RunnerError::ConfigValidationFailed {
                reason: format!("duplicate template name: {}", template.name),
            });
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Template names, sorted lexicographically.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    /// Applies a template to a group, returning the merged copy.
    ///
    /// The input group is never mutated. An empty template name returns the
    /// group unchanged. Per command: an empty working directory picks up
    /// the template's (or the temporary-directory sentinel when `work_dir`
    /// is `auto` with `temp_dir` set), a privileged template marks the
    /// command privileged, and description, executable, arguments,
    /// environment entries, and working directory are expanded against the
    /// merged variables (template over engine globals).
    ///
    /// # Errors
    ///
    /// `RunnerError::TemplateNotFound` for an unknown name and the parse
    /// errors of [`expand_template_string`].
    pub fn apply(&self, group: &GroupSpec, template_name: &str) -> Result<GroupSpec> {
        if template_name.is_empty() {
            return Ok(group.clone());
        }
        let template =
            self.templates
                .get(template_name)
                .ok_or_else(|| RunnerError::TemplateNotFound {
                    name: template_name.to_string(),
                })?;
        let vars = self.merged_vars(template);

        let mut merged = group.clone();
        merged.description = expand_template_string(&merged.description, &vars)?;

        for command in &mut merged.commands {
            if command.dir.is_empty() && !template.work_dir.is_empty() {
                if template.work_dir == WORK_DIR_AUTO && template.temp_dir {
                    command.dir = TEMP_DIR_SENTINEL.to_string();
                } else {
                    command.dir = expand_template_string(&template.work_dir, &vars)?;
                }
            }
            if template.privileged && !command.privileged {
                command.privileged = true;
            }

            command.description = expand_template_string(&command.description, &vars)?;
            command.cmd = expand_template_string(&command.cmd, &vars)?;
            for arg in &mut command.args {
                *arg = expand_template_string(arg, &vars)?;
            }
            for entry in &mut command.env {
                *entry = expand_template_string(entry, &vars)?;
            }
            // The sentinel is resolved by the executor, never here.
            if command.dir != TEMP_DIR_SENTINEL {
                command.dir = expand_template_string(&command.dir, &vars)?;
            }
        }
        Ok(merged)
    }

    /// Statically validates a template's variable graph.
    ///
    /// Runs a depth-first cycle check over `var -> referenced var` edges,
    /// then expands every variable value against the merged map as a dry
    /// run to surface syntax errors and dangling references.
    ///
    /// # Errors
    ///
    /// `RunnerError::TemplateNotFound`, `RunnerError::CircularDependency`,
    /// and the parse errors of [`expand_template_string`].
    pub fn validate(&self, template_name: &str) -> Result<()> {
        let template =
            self.templates
                .get(template_name)
                .ok_or_else(|| RunnerError::TemplateNotFound {
                    name: template_name.to_string(),
                })?;

        let mut state: BTreeMap<&str, VisitState> = BTreeMap::new();
        for name in template.variables.keys() {
            if !matches!(state.get(name.as_str()), Some(VisitState::Done)) {
                visit(name, &template.variables, &mut state)?;
            }
        }

        let merged = self.merged_vars(template);
        for value in template.variables.values() {
            expand_template_string(value, &merged)?;
        }
        Ok(())
    }

    fn merged_vars(&self, template: &Template) -> BTreeMap<String, String> {
        let mut vars = self.globals.clone();
        vars.extend(
            template
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        vars
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Done,
}

/// Depth-first walk over the template variable graph.
fn visit<'a>(
    name: &'a str,
    variables: &'a BTreeMap<String, String>,
    state: &mut BTreeMap<&'a str, VisitState>,
) -> Result<()> {
    state.insert(name, VisitState::Visiting);
    if let Some(value) = variables.get(name) {
        for reference in template_refs(value) {
            let Some((key, _)) = variables.get_key_value(reference.as_str()) else {
                // References outside the template graph are the dry run's
                // concern.
                continue;
            };
            match state.get(key.as_str()) {
                Some(VisitState::Visiting) => {
                    return Err(RunnerError::CircularDependency {
                        name: reference,
                    });
                }
                Some(VisitState::Done) => {}
                None => visit(key.as_str(), variables, state)?,
            }
        }
    }
    state.insert(name, VisitState::Done);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CommandSpec;

    fn vars(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn sample_group() -> GroupSpec {
        GroupSpec {
            name: "deploy".to_string(),
            description: "deploy {{.target}}".to_string(),
            commands: vec![CommandSpec {
                name: "push".to_string(),
                description: String::new(),
                cmd: "deploy-{{.target}}".to_string(),
                args: vec!["--env".to_string(), "{{.target}}".to_string()],
                env: vec!["TARGET={{.target}}".to_string()],
                ..CommandSpec::default()
            }],
            ..GroupSpec::default()
        }
    }

    fn engine_with(template: Template) -> TemplateEngine {
        let mut engine = TemplateEngine::new(BTreeMap::new());
        engine.register(template).unwrap();
        engine
    }

    #[test]
    fn test_empty_name_returns_group_unchanged() {
        let engine = TemplateEngine::new(BTreeMap::new());
        let group = sample_group();
        let out = engine.apply(&group, "").unwrap();
        assert_eq!(out.description, group.description);
    }

    #[test]
    fn test_unknown_template() {
        let engine = TemplateEngine::new(BTreeMap::new());
        assert!(matches!(
            engine.apply(&sample_group(), "absent"),
            Err(RunnerError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_apply_expands_all_fields() {
        let engine = engine_with(Template {
            name: "staging".to_string(),
            variables: vars(&[("target", "staging")]),
            ..Template::default()
        });

        let out = engine.apply(&sample_group(), "staging").unwrap();
        assert_eq!(out.description, "deploy staging");
        assert_eq!(out.commands[0].cmd, "deploy-staging");
        assert_eq!(out.commands[0].args[1], "staging");
        assert_eq!(out.commands[0].env[0], "TARGET=staging");
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let engine = engine_with(Template {
            name: "staging".to_string(),
            variables: vars(&[("target", "staging")]),
            ..Template::default()
        });

        let group = sample_group();
        let _ = engine.apply(&group, "staging").unwrap();
        assert_eq!(group.commands[0].cmd, "deploy-{{.target}}");
    }

    #[test]
    fn test_template_vars_override_engine_globals() {
        let mut engine = TemplateEngine::new(vars(&[("target", "default")]));
        engine
            .register(Template {
                name: "staging".to_string(),
                variables: vars(&[("target", "staging")]),
                ..Template::default()
            })
            .unwrap();

        let out = engine.apply(&sample_group(), "staging").unwrap();
        assert_eq!(out.commands[0].cmd, "deploy-staging");
    }

    #[test]
    fn test_work_dir_assigned_when_command_has_none() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            work_dir: "/srv/{{.target}}".to_string(),
            variables: vars(&[("target", "staging")]),
            ..Template::default()
        });

        let out = engine.apply(&sample_group(), "t").unwrap();
        assert_eq!(out.commands[0].dir, "/srv/staging");
    }

    #[test]
    fn test_work_dir_not_overwritten() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            work_dir: "/srv/other".to_string(),
            variables: vars(&[("target", "x")]),
            ..Template::default()
        });

        let mut group = sample_group();
        group.commands[0].dir = "/already/set".to_string();
        let out = engine.apply(&group, "t").unwrap();
        assert_eq!(out.commands[0].dir, "/already/set");
    }

    #[test]
    fn test_auto_work_dir_with_temp_dir_uses_sentinel() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            work_dir: "auto".to_string(),
            temp_dir: true,
            variables: vars(&[("target", "x")]),
            ..Template::default()
        });

        let out = engine.apply(&sample_group(), "t").unwrap();
        assert_eq!(out.commands[0].dir, TEMP_DIR_SENTINEL);
    }

    #[test]
    fn test_auto_work_dir_without_temp_dir_expands_literally() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            work_dir: "auto".to_string(),
            temp_dir: false,
            variables: vars(&[("target", "x")]),
            ..Template::default()
        });

        let out = engine.apply(&sample_group(), "t").unwrap();
        assert_eq!(out.commands[0].dir, "auto");
    }

    #[test]
    fn test_privileged_template_escalates_command() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            privileged: true,
            variables: vars(&[("target", "x")]),
            ..Template::default()
        });

        let out = engine.apply(&sample_group(), "t").unwrap();
        assert!(out.commands[0].privileged);
    }

    #[test]
    fn test_validate_accepts_acyclic_graph() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            variables: vars(&[
                ("base", "/srv"),
                ("path", "{{.base}}/app"),
                ("full", "{{.path}}/bin"),
            ]),
            ..Template::default()
        });
        engine.validate("t").unwrap();
    }

    #[test]
    fn test_validate_detects_cycle() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            variables: vars(&[("a", "{{.b}}"), ("b", "{{.a}}")]),
            ..Template::default()
        });
        assert!(matches!(
            engine.validate("t"),
            Err(RunnerError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_validate_detects_self_cycle() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            variables: vars(&[("a", "prefix {{.a}}")]),
            ..Template::default()
        });
        assert!(matches!(
            engine.validate("t"),
            Err(RunnerError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_validate_dry_run_catches_dangling_reference() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            variables: vars(&[("a", "{{.nowhere}}")]),
            ..Template::default()
        });
        assert!(matches!(
            engine.validate("t"),
            Err(RunnerError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_validate_dry_run_catches_syntax_error() {
        let engine = engine_with(Template {
            name: "t".to_string(),
            variables: vars(&[("a", "{{broken}}")]),
            ..Template::default()
        });
        assert!(matches!(
            engine.validate("t"),
            Err(RunnerError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_list_sorted() {
        let mut engine = TemplateEngine::new(BTreeMap::new());
        for name in ["zeta", "alpha", "mid"] {
            engine
                .register(Template {
                    name: name.to_string(),
                    ..Template::default()
                })
                .unwrap();
        }
        assert_eq!(engine.list(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_register_duplicate() {
        let mut engine = TemplateEngine::new(BTreeMap::new());
        engine
            .register(Template {
                name: "dup".to_string(),
                ..Template::default()
            })
            .unwrap();
        assert!(matches!(
            engine.register(Template {
                name: "dup".to_string(),
                ..Template::default()
            }),
            Err(RunnerError::ConfigValidationFailed { .. })
        ));
    }
}

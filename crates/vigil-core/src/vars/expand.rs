//! `${NAME}` expansion with escape handling and cycle detection.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::RunnerError;
use crate::Result;
use crate::config::is_valid_identifier;

/// Expands `${NAME}` references in command strings.
///
/// Resolution is two-tier: the trusted local map first, then the process
/// environment gated by the allowlist. Resolved values are expanded
/// recursively in the same mode; a visited set keyed by variable name
/// detects reference cycles.
///
/// The expander holds only borrows and is a pure function of its inputs:
/// repeated calls with identical inputs return identical outputs.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use vigil_core::vars::Expander;
///
/// let mut locals = BTreeMap::new();
/// locals.insert("region".to_string(), "eu-west-1".to_string());
/// let env = BTreeMap::new();
/// let allowlist: Vec<String> = Vec::new();
///
/// let expander = Expander::new(&locals, &env, &allowlist);
/// assert_eq!(expander.expand("deploy-${region}")?, "deploy-eu-west-1");
/// # Ok::<(), vigil_core::RunnerError>(())
/// ```
pub struct Expander<'a> {
    locals: &'a BTreeMap<String, String>,
    env: &'a BTreeMap<String, String>,
    allowlist: &'a [String],
}

impl<'a> Expander<'a> {
    /// Creates an expander over a local map, an environment snapshot, and
    /// the allowlist gating that environment.
    #[must_use]
    pub fn new(
        locals: &'a BTreeMap<String, String>,
        env: &'a BTreeMap<String, String>,
        allowlist: &'a [String],
    ) -> Self {
        Self {
            locals,
            env,
            allowlist,
        }
    }

    /// Expands all references in `input`.
    ///
    /// # Errors
    ///
    /// - `RunnerError::InvalidEscapeSequence` for `\x` other than `\$`/`\\`
    /// - `RunnerError::InvalidVariableFormat` for `$` not followed by `{`
    /// - `RunnerError::UnclosedVariable` for `${` without `}`
    /// - `RunnerError::InvalidVariableName` for `${}` or a malformed name
    /// - `RunnerError::VariableNotAllowed` for an environment reference
    ///   outside the allowlist
    /// - `RunnerError::VariableNotFound` when neither tier defines the name
    /// - `RunnerError::CircularReference` when resolution revisits a name
    pub fn expand(&self, input: &str) -> Result<String> {
        let mut visited = HashSet::new();
        self.expand_with_visited(input, &mut visited)
    }

    /// Expands a batch, failing on the first error with its index.
    ///
    /// # Errors
    ///
    /// `RunnerError::BatchExpansion` wrapping the first failure.
    pub fn expand_many(&self, inputs: &[String]) -> Result<Vec<String>> {
        let mut expanded = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let value = self
                .expand(input)
                .map_err(|e| RunnerError::BatchExpansion {
                    index,
                    source: Box::new(e),
                })?;
            expanded.push(value);
        }
        Ok(expanded)
    }

    fn expand_with_visited(&self, input: &str, visited: &mut HashSet<String>) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('$') => out.push('$'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        return Err(RunnerError::InvalidEscapeSequence { sequence: other });
                    }
                    None => return Err(RunnerError::InvalidEscapeSequence { sequence: '\\' }),
                },
                '$' => {
                    if chars.next() != Some('{') {
                        return Err(RunnerError::InvalidVariableFormat {
                            input: input.to_string(),
                        });
                    }
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(RunnerError::UnclosedVariable {
                            input: input.to_string(),
                        });
                    }
                    if !is_valid_identifier(&name) {
                        return Err(RunnerError::InvalidVariableName { name });
                    }
                    out.push_str(&self.resolve(&name, visited)?);
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn resolve(&self, name: &str, visited: &mut HashSet<String>) -> Result<String> {
        if visited.contains(name) {
            return Err(RunnerError::CircularReference {
                name: name.to_string(),
            });
        }

        let value = if let Some(value) = self.locals.get(name) {
            value.clone()
        } else if let Some(value) = self.env.get(name) {
            if !self.allowlist.iter().any(|allowed| allowed == name) {
                return Err(RunnerError::VariableNotAllowed {
                    name: name.to_string(),
                });
            }
            value.clone()
        } else {
            return Err(RunnerError::VariableNotFound {
                name: name.to_string(),
            });
        };

        visited.insert(name.to_string());
        let expanded = self.expand_with_visited(&value, visited);
        visited.remove(name);
        expanded
    }
}

/// Snapshots the process environment for expansion.
///
/// Non-UTF-8 entries are skipped; the allowlist gate happens at reference
/// time, not here.
#[must_use]
pub fn process_env_snapshot() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

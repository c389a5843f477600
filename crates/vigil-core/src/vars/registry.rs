//! Scoped variable storage.
//!
//! Variables live in two disjoint namespaces decided purely by the name's
//! first character: uppercase names are global, lowercase or underscore
//! names are local. Names starting with `__` are reserved for the runner
//! itself and never enter the registry.

use std::collections::BTreeMap;

use crate::RunnerError;
use crate::Result;

/// Variable namespace, derived from the name's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Uppercase-initial names, shared across groups.
    Global,
    /// Lowercase- or underscore-initial names, private to a group.
    Local,
}

impl Scope {
    /// Lowercase label used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Local => "local",
        }
    }
}

/// Derives the scope of a variable name, validating it along the way.
///
/// # Errors
///
/// - `RunnerError::ReservedName` for names starting with `__`
/// - `RunnerError::InvalidVariableName` for empty names, names starting
///   with a digit or symbol, or names with characters outside
///   `[A-Za-z0-9_]`
///
/// # Examples
///
/// ```
/// use vigil_core::vars::Scope;
/// use vigil_core::vars::determine_scope;
///
/// assert_eq!(determine_scope("BUILD_ROOT")?, Scope::Global);
/// assert_eq!(determine_scope("build_root")?, Scope::Local);
/// assert!(determine_scope("__runner_pid").is_err());
/// # Ok::<(), vigil_core::RunnerError>(())
/// ```
pub fn determine_scope(name: &str) -> Result<Scope> {
    if name.starts_with("__") {
        return Err(RunnerError::ReservedName {
            name: name.to_string(),
        });
    }
    let mut chars = name.chars();
    let scope = match chars.next() {
        Some(c) if c.is_ascii_uppercase() => Scope::Global,
        Some(c) if c.is_ascii_lowercase() || c == '_' => Scope::Local,
        _ => {
            return Err(RunnerError::InvalidVariableName {
                name: name.to_string(),
            });
        }
    };
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RunnerError::InvalidVariableName {
            name: name.to_string(),
        });
    }
    Ok(scope)
}

/// Two-namespace variable store.
///
/// The root registry is populated during configuration load and read-only
/// afterwards. [`VariableRegistry::with_locals`] derives a child that owns
/// a fresh local map and a copy of the parent's globals; the parent is
/// never mutated through a child.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    globals: BTreeMap<String, String>,
    locals: BTreeMap<String, String>,
}

impl VariableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a global variable.
    ///
    /// # Errors
    ///
    /// `RunnerError::ScopeMismatch` when the name resolves to the local
    /// namespace, plus the naming errors of [`determine_scope`].
    pub fn register_global(&mut self, name: &str, value: &str) -> Result<()> {
        match determine_scope(name)? {
            Scope::Global => {
                self.globals.insert(name.to_string(), value.to_string());
                Ok(())
            }
            Scope::Local => Err(RunnerError::ScopeMismatch {
                name: name.to_string(),
                expected: Scope::Global.as_str(),
                actual: Scope::Local.as_str(),
            }),
        }
    }

    /// Derives a child registry carrying `locals` and this registry's
    /// globals.
    ///
    /// # Errors
    ///
    /// `RunnerError::ScopeMismatch` when any name resolves to the global
    /// namespace, plus the naming errors of [`determine_scope`].
    pub fn with_locals(&self, locals: &BTreeMap<String, String>) -> Result<Self> {
        let mut owned = BTreeMap::new();
        for (name, value) in locals {
            match determine_scope(name)? {
                Scope::Local => {
                    owned.insert(name.clone(), value.clone());
                }
                Scope::Global => {
                    return Err(RunnerError::ScopeMismatch {
                        name: name.clone(),
                        expected: Scope::Local.as_str(),
                        actual: Scope::Global.as_str(),
                    });
                }
            }
        }
        Ok(Self {
            globals: self.globals.clone(),
            locals: owned,
        })
    }

    /// Resolves a variable by name in its scope's namespace.
    ///
    /// # Errors
    ///
    /// `RunnerError::UndefinedGlobal` or `RunnerError::UndefinedLocal` for
    /// lookup misses, plus the naming errors of [`determine_scope`].
    pub fn resolve(&self, name: &str) -> Result<&str> {
        match determine_scope(name)? {
            Scope::Global => {
                self.globals
                    .get(name)
                    .map(String::as_str)
                    .ok_or_else(|| RunnerError::UndefinedGlobal {
                        name: name.to_string(),
                    })
            }
            Scope::Local => {
                self.locals
                    .get(name)
                    .map(String::as_str)
                    .ok_or_else(|| RunnerError::UndefinedLocal {
                        name: name.to_string(),
                    })
            }
        }
    }

    /// Name-sorted snapshot of the global namespace.
    #[must_use]
    pub fn global_vars(&self) -> Vec<(String, String)> {
        self.globals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Name-sorted snapshot of the local namespace.
    #[must_use]
    pub fn local_vars(&self) -> Vec<(String, String)> {
        self.locals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Single map holding both namespaces.
    ///
    /// The namespaces are disjoint by construction (scope is a function of
    /// the name), so no shadowing can occur.
    #[must_use]
    pub fn merged(&self) -> BTreeMap<String, String> {
        let mut merged = self.globals.clone();
        merged.extend(self.locals.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

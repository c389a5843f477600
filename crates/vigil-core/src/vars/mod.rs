//! Variable registry, auto-variables, and `${NAME}` expansion.

mod auto;
mod expand;
mod registry;

pub use auto::AUTO_VAR_PREFIX;
pub use auto::DATETIME_VAR;
pub use auto::PID_VAR;
pub use auto::generate_auto_vars;
pub use auto::generate_auto_vars_at;
pub use expand::Expander;
pub use expand::process_env_snapshot;
pub use registry::Scope;
pub use registry::VariableRegistry;
pub use registry::determine_scope;

//! Environment trust boundary: allowlists, value screening, merging.

mod filter;
mod merge;

pub use filter::DANGEROUS_PATTERNS;
pub use filter::EnvironmentFilter;
pub use filter::validate_name;
pub use filter::validate_value;
pub use merge::resolve_group_env;
pub use merge::resolve_group_env_from;
pub use merge::split_env_entry;

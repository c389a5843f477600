//! Hardened command-runner core with file integrity verification.
//!
//! `vigil-core` validates a declarative configuration of command groups,
//! verifies referenced files against recorded SHA-256 digests through
//! symlink-resistant file I/O, expands variables and environment under
//! strict allowlist rules, classifies per-command risk, and produces an
//! execution plan. Spawning the planned commands is left to an external
//! executor.
//!
//! # Examples
//!
//! ```no_run
//! use vigil_core::integrity::VerificationManager;
//! use vigil_core::plan::PlanOptions;
//! use vigil_core::plan::Planner;
//!
//! # fn main() -> vigil_core::Result<()> {
//! # let config: vigil_core::config::ConfigSpec = todo!();
//! config.validate()?;
//! let manager = VerificationManager::new_production()?;
//! let plan = Planner::new(&config, &manager).plan(&PlanOptions::default())?;
//! println!("planned {} group(s)", plan.groups.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod groups;
pub mod integrity;
pub mod plan;
pub mod risk;
pub mod safefs;
pub mod template;
pub mod vars;

// Re-export main API types
pub use config::CommandSpec;
pub use config::ConfigSpec;
pub use config::GroupSpec;
pub use env::EnvironmentFilter;
pub use error::Result;
pub use error::RunnerError;
pub use integrity::FileValidator;
pub use integrity::VerificationManager;
pub use plan::ExecutionPlan;
pub use plan::PlanOptions;
pub use plan::Planner;
pub use risk::RiskLevel;
pub use template::Template;
pub use template::TemplateEngine;
pub use vars::Expander;
pub use vars::VariableRegistry;

//! CLI subcommand implementations.

pub mod completion;
pub mod record;
pub mod run;
pub mod validate;
pub mod verify;

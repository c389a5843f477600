//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use std::path::PathBuf;
use vigil_core::RiskLevel;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify, expand, and classify a configuration; print the plan
    Run(RunArgs),
    /// Record file digests into a hash directory
    Record(RecordArgs),
    /// Verify files against recorded digests
    Verify(VerifyArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Comma-separated group names to plan (default: all groups)
    #[arg(short, long, value_name = "NAMES")]
    pub groups: Option<String>,

    /// Plan without strict hash-directory validation; missing hash
    /// records become warnings
    #[arg(long)]
    pub dry_run: bool,

    /// Hash directory override (dry-run only)
    #[arg(long, value_name = "DIR")]
    pub hash_dir: Option<PathBuf>,

    /// Highest acceptable risk level for planned commands
    #[arg(long, value_enum, default_value = "medium")]
    pub max_risk: MaxRisk,

    /// KEY=VALUE file merged into group environments
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct RecordArgs {
    /// Files to record digests for
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Hash directory to write records into
    #[arg(long, value_name = "DIR")]
    pub hash_dir: PathBuf,

    /// Overwrite existing records
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Files to verify
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Hash directory holding the records (default: the built-in
    /// production directory)
    #[arg(long, value_name = "DIR")]
    pub hash_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Risk ceiling accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MaxRisk {
    Low,
    Medium,
    High,
    Critical,
}

impl From<MaxRisk> for RiskLevel {
    fn from(value: MaxRisk) -> Self {
        match value {
            MaxRisk::Low => Self::Low,
            MaxRisk::Medium => Self::Medium,
            MaxRisk::High => Self::High,
            MaxRisk::Critical => Self::Critical,
        }
    }
}

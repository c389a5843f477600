//! Vigil CLI - hardened command runner: verify, expand, classify, plan.

mod cli;
mod commands;
mod config_loader;
mod error;
mod output;

use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.verbose)?;

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match &cli.command {
        cli::Commands::Run(args) => commands::run::execute(args, &*formatter),
        cli::Commands::Record(args) => commands::record::execute(args, &*formatter),
        cli::Commands::Verify(args) => commands::verify::execute(args, &*formatter),
        cli::Commands::Validate(args) => commands::validate::execute(args, &*formatter),
        cli::Commands::Completion(args) => commands::completion::execute(args),
    }
}

/// Installs the diagnostic layer on stderr.
///
/// `--log-level` wins over `RUST_LOG`; with neither, `--verbose` raises
/// the default from `warn` to `info`.
fn init_tracing(level: Option<&str>, verbose: bool) -> Result<()> {
    let filter = match level {
        Some(level) => {
            EnvFilter::try_new(level).map_err(|_| anyhow!("invalid log level: {level:?}"))?
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" })),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

//! `vigil completion`: emit shell completion scripts.

use anyhow::Result;
use clap::CommandFactory;

use crate::cli::Cli;
use crate::cli::CompletionArgs;

pub fn execute(args: &CompletionArgs) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

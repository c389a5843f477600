//! `vigil run`: build and print the execution plan.

use anyhow::Result;
use vigil_core::PlanOptions;
use vigil_core::Planner;
use vigil_core::VerificationManager;
use vigil_core::groups::parse_group_names;

use crate::cli::RunArgs;
use crate::config_loader;
use crate::error::convert_runner_error;
use crate::output::OutputFormatter;

pub fn execute(args: &RunArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let manager = build_manager(args)?;
    if manager.is_dry_run() {
        formatter.format_warning("dry run: missing hash records will not fail the plan");
    }

    let config = config_loader::load_config_verified(&args.config, &manager)?;

    let groups = args
        .groups
        .as_deref()
        .map(parse_group_names)
        .unwrap_or_default();
    let env_file = match &args.env_file {
        Some(path) => config_loader::load_env_file(path)?,
        None => std::collections::BTreeMap::new(),
    };
    let options = PlanOptions {
        groups,
        max_risk: args.max_risk.into(),
        env_file,
    };

    let plan = Planner::new(&config, &manager)
        .plan(&options)
        .map_err(|e| convert_runner_error(e, &args.config))?;
    formatter.format_plan(&plan)
}

/// Picks the verification mode from the flags.
///
/// A hash-directory override is a dry-run facility; production mode
/// rejects it with a typed error rather than silently trusting an
/// unvalidated directory.
fn build_manager(args: &RunArgs) -> Result<VerificationManager> {
    if args.dry_run {
        return Ok(match &args.hash_dir {
            Some(dir) => VerificationManager::new_for_dry_run_with_dir(dir),
            None => VerificationManager::new_for_dry_run(),
        });
    }
    let manager = match &args.hash_dir {
        Some(dir) => VerificationManager::new_production_with_dir(dir),
        None => VerificationManager::new_production(),
    };
    manager.map_err(|e| convert_runner_error(e, &args.config))
}

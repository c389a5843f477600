//! Execution planning.
//!
//! The planner runs the whole pre-execution pipeline: file verification,
//! group selection, template application, variable and environment
//! expansion, and risk classification. Its output is the plan itself;
//! spawning the planned commands is the executor's job and outside this
//! crate.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::RunnerError;
use crate::Result;
use crate::config::CommandSpec;
use crate::config::ConfigSpec;
use crate::env::EnvironmentFilter;
use crate::env::resolve_group_env;
use crate::env::split_env_entry;
use crate::env::validate_value;
use crate::groups::filter_groups;
use crate::integrity::VerificationManager;
use crate::risk::RiskLevel;
use crate::risk::evaluate_risk;
use crate::template::TEMP_DIR_SENTINEL;
use crate::template::TemplateEngine;
use crate::vars::Expander;
use crate::vars::VariableRegistry;
use crate::vars::generate_auto_vars;
use crate::vars::process_env_snapshot;

/// Options governing a planning run.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Requested group names; empty selects every group.
    pub groups: Vec<String>,

    /// Commands classifying above this level fail the plan. `Unknown`
    /// always fails.
    pub max_risk: RiskLevel,

    /// Entries loaded from an env file, merged per the allowlist rules.
    pub env_file: BTreeMap<String, String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            max_risk: RiskLevel::Medium,
            env_file: BTreeMap::new(),
        }
    }
}

/// A fully expanded, risk-annotated command ready for an executor.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCommand {
    /// Command name from the configuration.
    pub name: String,
    /// Human-readable description after template expansion.
    pub description: String,
    /// Expanded executable.
    pub cmd: String,
    /// Expanded arguments.
    pub args: Vec<String>,
    /// Final environment, fully expanded.
    pub env: BTreeMap<String, String>,
    /// Expanded working directory; may carry the temporary-directory
    /// sentinel for the executor to resolve.
    pub dir: String,
    /// Whether the command runs with elevated privileges.
    pub privileged: bool,
    /// Assigned risk level.
    pub risk: RiskLevel,
    /// Timeout in seconds, if configured.
    pub timeout: Option<u64>,
    /// Output size cap in bytes, if configured.
    pub output_size_limit: Option<u64>,
}

/// A planned group in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedGroup {
    /// Group name.
    pub name: String,
    /// Description after template expansion.
    pub description: String,
    /// Commands in execution order.
    pub commands: Vec<PlannedCommand>,
}

/// The planner's product: everything an executor needs, nothing run yet.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    /// Whether the plan was produced under dry-run verification.
    pub dry_run: bool,
    /// Number of files that passed verification.
    pub files_verified: usize,
    /// Planned groups in selection order.
    pub groups: Vec<PlannedGroup>,
}

/// Wires the core components into a planning pipeline.
pub struct Planner<'a> {
    config: &'a ConfigSpec,
    manager: &'a VerificationManager,
}

impl<'a> Planner<'a> {
    /// Creates a planner over a validated configuration and a constructed
    /// verification manager.
    #[must_use]
    pub fn new(config: &'a ConfigSpec, manager: &'a VerificationManager) -> Self {
        Self { config, manager }
    }

    /// Produces the execution plan.
    ///
    /// Pipeline order: verify the configured file set, build the variable
    /// registry and template engine, select groups, then per group apply
    /// the template, resolve the environment, expand every command, and
    /// classify its risk against the configured ceiling.
    ///
    /// # Errors
    ///
    /// The first failure from any stage, unchanged: verification errors,
    /// registry scope errors, template errors, environment validation
    /// errors, expansion errors, `RunnerError::GroupNotFound`, or
    /// `RunnerError::RiskLimitExceeded`.
    pub fn plan(&self, options: &PlanOptions) -> Result<ExecutionPlan> {
        let files_verified = self
            .manager
            .verify_files(self.config.global.verify_files.iter().map(Path::new))?;

        let mut registry = VariableRegistry::new();
        for (name, value) in &self.config.variables {
            registry.register_global(name, value)?;
        }

        let mut engine = TemplateEngine::new(registry.merged());
        for template in &self.config.templates {
            engine.register(template.clone())?;
            engine.validate(&template.name)?;
        }

        let filter = EnvironmentFilter::new(&self.config.global.env_allowlist);
        let auto_vars = generate_auto_vars();
        let env_snapshot = process_env_snapshot();

        let selected = filter_groups(&options.groups, Some(self.config))?;
        let mut groups = Vec::with_capacity(selected.len());
        for group_name in &selected {
            let group = self.config.group(group_name).ok_or_else(|| {
                RunnerError::GroupNotFound {
                    missing: vec![group_name.clone()],
                    available: self.config.groups.iter().map(|g| g.name.clone()).collect(),
                }
            })?;
            let templated = engine.apply(group, group.template.as_deref().unwrap_or(""))?;

            let mut vars = registry.with_locals(&group.variables)?.merged();
            vars.extend(auto_vars.clone());

            let allowlist = filter
                .resolved_allowlist(group.env_allowlist.as_deref())
                .to_vec();
            let group_env = resolve_group_env(&filter, &templated, &options.env_file)?;
            let expander = Expander::new(&vars, &env_snapshot, &allowlist);

            let mut commands = Vec::with_capacity(templated.commands.len());
            for command in &templated.commands {
                commands.push(plan_command(
                    command,
                    &group_env,
                    &expander,
                    options.max_risk,
                )?);
            }

            groups.push(PlannedGroup {
                name: templated.name.clone(),
                description: templated.description.clone(),
                commands,
            });
        }

        Ok(ExecutionPlan {
            dry_run: self.manager.is_dry_run(),
            files_verified,
            groups,
        })
    }
}

/// Expands and classifies one command.
fn plan_command(
    command: &CommandSpec,
    group_env: &BTreeMap<String, String>,
    expander: &Expander<'_>,
    max_risk: RiskLevel,
) -> Result<PlannedCommand> {
    let mut env = group_env.clone();
    for entry in &command.env {
        let (name, value) = split_env_entry(entry)?;
        validate_value(name, value)?;
        env.insert(name.to_string(), value.to_string());
    }

    let cmd = expander.expand(&command.cmd)?;
    let args = expander.expand_many(&command.args)?;
    let dir = if command.dir == TEMP_DIR_SENTINEL {
        command.dir.clone()
    } else {
        expander.expand(&command.dir)?
    };
    let mut expanded_env = BTreeMap::new();
    for (name, value) in env {
        expanded_env.insert(name, expander.expand(&value)?);
    }

    let classified = CommandSpec {
        cmd: cmd.clone(),
        args: args.clone(),
        ..command.clone()
    };
    let risk = evaluate_risk(&classified);
    if risk > max_risk {
        return Err(RunnerError::RiskLimitExceeded {
            command: command.name.clone(),
            level: risk.to_string(),
            max: max_risk.to_string(),
        });
    }

    Ok(PlannedCommand {
        name: command.name.clone(),
        description: command.description.clone(),
        cmd,
        args,
        env: expanded_env,
        dir,
        privileged: command.privileged,
        risk,
        timeout: command.timeout,
        output_size_limit: command.output_size_limit,
    })
}

//! `vigil validate`: check a configuration without planning.

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use std::collections::BTreeMap;
use vigil_core::ConfigSpec;
use vigil_core::TemplateEngine;
use vigil_core::safefs;

use crate::cli::ValidateArgs;
use crate::config_loader::absolutize;
use crate::error::convert_runner_error;
use crate::output::OutputFormatter;
use crate::output::ValidationReport;

pub fn execute(args: &ValidateArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let absolute = absolutize(&args.config)?;
    let bytes = safefs::safe_read(&absolute, safefs::DEFAULT_MAX_READ_SIZE)
        .map_err(|e| convert_runner_error(e, &args.config))?;
    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("configuration '{}' is not UTF-8", args.config.display()))?;
    let spec: ConfigSpec = toml::from_str(text)
        .with_context(|| format!("configuration '{}' is not valid TOML", args.config.display()))?;

    let mut problems = Vec::new();
    if let Err(e) = spec.validate() {
        problems.push(e.to_string());
    }

    // Template graphs are checked even when spec-level validation already
    // failed, so one run reports both classes of problems.
    let mut engine = TemplateEngine::new(BTreeMap::new());
    for template in &spec.templates {
        let name = template.name.clone();
        if let Err(e) = engine.register(template.clone()) {
            problems.push(e.to_string());
            continue;
        }
        if let Err(e) = engine.validate(&name) {
            problems.push(format!("template {name}: {e}"));
        }
    }

    let report = ValidationReport {
        config: args.config.clone(),
        groups: spec.groups.len(),
        commands: spec.groups.iter().map(|g| g.commands.len()).sum(),
        templates: spec.templates.len(),
        problems,
    };
    formatter.format_validation_report(&report)?;

    if report.problems.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "configuration '{}' failed validation",
            args.config.display()
        ))
    }
}

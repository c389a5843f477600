//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::RecordOutcome;
use super::formatter::ValidationReport;
use super::formatter::VerifyOutcome;
use super::formatter::VerifyStatus;
use anyhow::Result;
use console::Term;
use console::style;
use vigil_core::ExecutionPlan;
use vigil_core::RiskLevel;
use vigil_core::plan::PlannedCommand;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn risk_label(&self, risk: RiskLevel) -> String {
        if !self.use_colors {
            return risk.to_string();
        }
        match risk {
            RiskLevel::Low => style(risk).green().to_string(),
            RiskLevel::Medium => style(risk).yellow().to_string(),
            RiskLevel::High => style(risk).red().to_string(),
            RiskLevel::Critical | RiskLevel::Unknown => style(risk).red().bold().to_string(),
        }
    }

    fn command_lines(&self, command: &PlannedCommand) {
        let privileged = if command.privileged { " [privileged]" } else { "" };
        self.line(&format!(
            "    {} ({}){}",
            command.name,
            self.risk_label(command.risk),
            privileged
        ));
        self.line(&format!(
            "      $ {} {}",
            command.cmd,
            command.args.join(" ")
        ));
        if !command.dir.is_empty() {
            self.line(&format!("      dir: {}", command.dir));
        }
        if let Some(timeout) = command.timeout {
            self.line(&format!("      timeout: {timeout}s"));
        }
        if self.verbose {
            for (name, value) in &command.env {
                self.line(&format!("      env: {name}={value}"));
            }
        } else if !command.env.is_empty() {
            self.line(&format!("      env: {} variable(s)", command.env.len()));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_plan(&self, plan: &ExecutionPlan) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mode = if plan.dry_run { " (dry run)" } else { "" };
        if self.use_colors {
            self.line(&format!(
                "{} Execution plan{mode}",
                style("✓").green().bold()
            ));
        } else {
            self.line(&format!("Execution plan{mode}"));
        }
        self.line(&format!("  Files verified: {}", plan.files_verified));

        for group in &plan.groups {
            if group.description.is_empty() {
                self.line(&format!("  Group {}", group.name));
            } else {
                self.line(&format!("  Group {} - {}", group.name, group.description));
            }
            for command in &group.commands {
                self.command_lines(command);
            }
        }
        Ok(())
    }

    fn format_record_outcomes(&self, outcomes: &[RecordOutcome]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        for outcome in outcomes {
            self.line(&format!(
                "recorded {} -> {}",
                outcome.path.display(),
                outcome.record_name
            ));
        }
        self.line(&format!("{} record(s) written", outcomes.len()));
        Ok(())
    }

    fn format_verify_outcomes(&self, outcomes: &[VerifyOutcome]) -> Result<()> {
        let mut verified = 0usize;
        for outcome in outcomes {
            match outcome.status {
                VerifyStatus::Verified => {
                    verified += 1;
                    if !self.quiet {
                        if self.use_colors {
                            self.line(&format!(
                                "{} {}",
                                style("ok").green(),
                                outcome.path.display()
                            ));
                        } else {
                            self.line(&format!("ok {}", outcome.path.display()));
                        }
                    }
                }
                status => {
                    let label = match status {
                        VerifyStatus::Missing => "missing",
                        VerifyStatus::Mismatch => "MISMATCH",
                        _ => "error",
                    };
                    let styled = if self.use_colors {
                        style(label).red().bold().to_string()
                    } else {
                        label.to_string()
                    };
                    self.line(&format!("{styled} {}", outcome.path.display()));
                    if let Some(detail) = &outcome.detail
                        && self.verbose
                    {
                        self.line(&format!("  {detail}"));
                    }
                }
            }
        }
        if !self.quiet {
            self.line(&format!("{verified}/{} file(s) verified", outcomes.len()));
        }
        Ok(())
    }

    fn format_validation_report(&self, report: &ValidationReport) -> Result<()> {
        if report.problems.is_empty() {
            if !self.quiet {
                if self.use_colors {
                    self.line(&format!(
                        "{} {} is valid",
                        style("✓").green().bold(),
                        report.config.display()
                    ));
                } else {
                    self.line(&format!("{} is valid", report.config.display()));
                }
                self.line(&format!(
                    "  {} group(s), {} command(s), {} template(s)",
                    report.groups, report.commands, report.templates
                ));
            }
            return Ok(());
        }

        self.line(&format!("{} is invalid:", report.config.display()));
        for problem in &report.problems {
            self.line(&format!("  - {problem}"));
        }
        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.use_colors {
            self.line(&format!("{} {message}", style("warning:").yellow().bold()));
        } else {
            self.line(&format!("warning: {message}"));
        }
    }
}

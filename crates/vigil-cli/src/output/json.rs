//! JSON output formatter.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::RecordOutcome;
use super::formatter::ValidationReport;
use super::formatter::VerifyOutcome;
use super::formatter::VerifyStatus;
use anyhow::Result;
use serde::Serialize;

pub struct JsonFormatter;

impl JsonFormatter {
    fn emit<T: Serialize>(output: &JsonOutput<T>) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(output)?);
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_plan(&self, plan: &vigil_core::ExecutionPlan) -> Result<()> {
        Self::emit(&JsonOutput::success("run", plan))
    }

    fn format_record_outcomes(&self, outcomes: &[RecordOutcome]) -> Result<()> {
        Self::emit(&JsonOutput::success("record", outcomes))
    }

    fn format_verify_outcomes(&self, outcomes: &[VerifyOutcome]) -> Result<()> {
        let all_verified = outcomes
            .iter()
            .all(|o| o.status == VerifyStatus::Verified);
        if all_verified {
            Self::emit(&JsonOutput::success("verify", outcomes))
        } else {
            Self::emit(&JsonOutput::failure("verify", outcomes))
        }
    }

    fn format_validation_report(&self, report: &ValidationReport) -> Result<()> {
        if report.problems.is_empty() {
            Self::emit(&JsonOutput::success("validate", report))
        } else {
            Self::emit(&JsonOutput::failure("validate", report))
        }
    }

    fn format_warning(&self, _message: &str) {
        // Warnings go to the log layer in JSON mode; stdout stays machine
        // readable.
    }
}

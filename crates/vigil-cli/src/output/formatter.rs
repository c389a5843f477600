//! Output formatter trait for CLI results.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use vigil_core::ExecutionPlan;

/// Per-file outcome of a record operation.
#[derive(Debug, Serialize)]
pub struct RecordOutcome {
    pub path: PathBuf,
    pub record_name: String,
}

/// Per-file outcome of a verify operation.
#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub path: PathBuf,
    pub status: VerifyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    Verified,
    Missing,
    Mismatch,
    Error,
}

/// Result of validating a configuration file.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub config: PathBuf,
    pub groups: usize,
    pub commands: usize,
    pub templates: usize,
    pub problems: Vec<String>,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format an execution plan
    fn format_plan(&self, plan: &ExecutionPlan) -> Result<()>;

    /// Format digest-record outcomes
    fn format_record_outcomes(&self, outcomes: &[RecordOutcome]) -> Result<()>;

    /// Format verification outcomes
    fn format_verify_outcomes(&self, outcomes: &[VerifyOutcome]) -> Result<()>;

    /// Format a configuration validation report
    fn format_validation_report(&self, report: &ValidationReport) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
        }
    }

    pub fn failure(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Failure,
            data: Some(data),
        }
    }
}

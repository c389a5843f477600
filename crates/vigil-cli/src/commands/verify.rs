//! `vigil verify`: check files against recorded digests.

use anyhow::Result;
use anyhow::anyhow;
use std::path::Path;
use vigil_core::FileValidator;
use vigil_core::RunnerError;
use vigil_core::integrity::DEFAULT_HASH_DIR;

use crate::cli::VerifyArgs;
use crate::config_loader::absolutize;
use crate::output::OutputFormatter;
use crate::output::VerifyOutcome;
use crate::output::VerifyStatus;

pub fn execute(args: &VerifyArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let hash_dir = match &args.hash_dir {
        Some(dir) => absolutize(dir)?,
        None => Path::new(DEFAULT_HASH_DIR).to_path_buf(),
    };
    let validator = FileValidator::new(hash_dir);

    let mut outcomes = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let path = absolutize(file)?;
        let outcome = match validator.verify(&path) {
            Ok(()) => VerifyOutcome {
                path,
                status: VerifyStatus::Verified,
                detail: None,
            },
            Err(RunnerError::MissingHash { .. }) => VerifyOutcome {
                path,
                status: VerifyStatus::Missing,
                detail: None,
            },
            Err(RunnerError::HashMismatch {
                expected, actual, ..
            }) => VerifyOutcome {
                path,
                status: VerifyStatus::Mismatch,
                detail: Some(format!("recorded {expected}, current {actual}")),
            },
            Err(e) => VerifyOutcome {
                path,
                status: VerifyStatus::Error,
                detail: Some(e.to_string()),
            },
        };
        outcomes.push(outcome);
    }

    formatter.format_verify_outcomes(&outcomes)?;

    let failed = outcomes
        .iter()
        .filter(|o| o.status != VerifyStatus::Verified)
        .count();
    if failed > 0 {
        return Err(anyhow!("{failed} of {} file(s) failed verification", outcomes.len()));
    }
    Ok(())
}

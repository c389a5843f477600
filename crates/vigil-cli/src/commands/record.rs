//! `vigil record`: write digest records for files.

use anyhow::Result;
use vigil_core::FileValidator;

use crate::cli::RecordArgs;
use crate::config_loader::absolutize;
use crate::error::convert_runner_error;
use crate::output::OutputFormatter;
use crate::output::RecordOutcome;

pub fn execute(args: &RecordArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let hash_dir = absolutize(&args.hash_dir)?;
    let validator = FileValidator::new(hash_dir);

    let mut outcomes = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let path = absolutize(file)?;
        let record_name = validator
            .record(&path, args.force)
            .map_err(|e| convert_runner_error(e, file))?;
        tracing::info!(path = %path.display(), record = %record_name, "digest recorded");
        outcomes.push(RecordOutcome { path, record_name });
    }

    formatter.format_record_outcomes(&outcomes)
}

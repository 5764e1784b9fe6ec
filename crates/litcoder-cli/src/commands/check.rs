//! Check command implementation.

use crate::cli::JobArgs;
use crate::error::Result;
use crate::output::Formatter;
use litcoder_extractor::{missing_documents, JobConfig, PriorStage};

/// Execute the check command.
///
/// Validates the job file and schema, confirms a configured prior stage is
/// readable, and lists documents that are not on disk.
pub fn execute_check(args: JobArgs, formatter: &Formatter) -> Result<()> {
    let job = match JobConfig::from_file(&args.job).and_then(|config| config.resolve()) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("{}", formatter.error(&format!("{} is not a valid job", args.job.display())));
            return Err(e.into());
        }
    };

    if let Some(context) = &job.context {
        PriorStage::load(context, &job.layout)?;
    }

    let missing = missing_documents(&job);
    println!("{}", formatter.format_check(&job.name, job.items.len(), &missing)?);

    Ok(())
}

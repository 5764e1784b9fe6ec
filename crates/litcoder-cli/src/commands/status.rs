//! Status command implementation.

use crate::cli::JobArgs;
use crate::error::Result;
use crate::output::Formatter;
use litcoder_extractor::{job_status, JobConfig};

/// Execute the status command.
pub fn execute_status(args: JobArgs, formatter: &Formatter) -> Result<()> {
    let job = JobConfig::from_file(&args.job)?.resolve()?;
    let report = job_status(&job);

    println!("{}", formatter.format_status(&report)?);

    Ok(())
}

//! Offline job inspection: per-item status and missing documents

use crate::checkpoint::CheckpointTable;
use crate::config::JobSpec;
use crate::types::{ItemStatus, StatusReport};
use litcoder_domain::ItemState;
use std::path::PathBuf;

/// Read the checkpoint and document directory and report each item's state
pub fn job_status(job: &JobSpec) -> StatusReport {
    let table = CheckpointTable::load(&job.output, job.layout.clone());

    let items = job
        .items
        .iter()
        .map(|item| ItemStatus {
            name: item.name().to_string(),
            state: table.status_of(item.name()).unwrap_or(ItemState::Pending),
            document_present: item.path_in(&job.document_dir).is_file(),
        })
        .collect();

    StatusReport {
        job: job.name.clone(),
        output: job.output.clone(),
        items,
    }
}

/// Paths of job documents that are not on disk
pub fn missing_documents(job: &JobSpec) -> Vec<PathBuf> {
    job.items
        .iter()
        .map(|item| item.path_in(&job.document_dir))
        .filter(|path| !path.is_file())
        .collect()
}

//! Run and status report types

use litcoder_domain::ItemState;
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one work item in a run
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    /// Item name
    pub name: String,

    /// Terminal state reached
    #[serde(serialize_with = "serialize_state")]
    pub state: ItemState,

    /// Wall-clock time spent, when the item reached the vendor
    #[serde(serialize_with = "serialize_seconds", rename = "elapsed_seconds")]
    pub elapsed: Option<Duration>,

    /// Error message for failed items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemReport {
    /// Elapsed time as `12.34 seconds`, or `no timing recorded`
    pub fn timing(&self) -> String {
        match self.elapsed {
            Some(elapsed) => format!("{:.2} seconds", elapsed.as_secs_f64()),
            None => "no timing recorded".to_string(),
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Job name
    pub job: String,

    /// Number of items in the job
    pub total: usize,

    /// Items written successfully this run
    pub succeeded: usize,

    /// Items that failed this run
    pub failed: usize,

    /// Items skipped because they were already done
    pub skipped: usize,

    /// Rows in the checkpoint after the run
    pub rows_written: usize,

    /// Checkpoint path
    pub output: PathBuf,

    /// Per-item outcomes in job order
    pub items: Vec<ItemReport>,
}

impl RunSummary {
    /// Create an empty summary for a job
    pub fn new(job: impl Into<String>, output: PathBuf) -> Self {
        Self {
            job: job.into(),
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            rows_written: 0,
            output,
            items: Vec::new(),
        }
    }

    /// Record one item's outcome
    pub fn record(&mut self, report: ItemReport) {
        self.total += 1;
        match report.state {
            ItemState::Succeeded => self.succeeded += 1,
            ItemState::Failed => self.failed += 1,
            ItemState::Skipped => self.skipped += 1,
            ItemState::Pending => {}
        }
        self.items.push(report);
    }

    /// Whether every item ended up succeeded or skipped
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.succeeded + self.skipped == self.total
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{}: {} items, {} succeeded, {} skipped, {} failed, {} rows in {}",
            self.job,
            self.total,
            self.succeeded,
            self.skipped,
            self.failed,
            self.rows_written,
            self.output.display()
        )
    }
}

/// Recorded state of one item, read from the checkpoint without network calls
#[derive(Debug, Clone, Serialize)]
pub struct ItemStatus {
    /// Item name
    pub name: String,

    /// `Succeeded`, `Failed` or `Pending`
    #[serde(serialize_with = "serialize_state")]
    pub state: ItemState,

    /// Whether the document is in the document directory
    pub document_present: bool,
}

/// Status of every item in a job
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Job name
    pub job: String,

    /// Checkpoint path
    pub output: PathBuf,

    /// Per-item status in job order
    pub items: Vec<ItemStatus>,
}

impl StatusReport {
    /// Number of items in the given state
    pub fn count(&self, state: ItemState) -> usize {
        self.items.iter().filter(|item| item.state == state).count()
    }

    /// Items whose document is missing
    pub fn missing_documents(&self) -> impl Iterator<Item = &ItemStatus> {
        self.items.iter().filter(|item| !item.document_present)
    }
}

fn serialize_state<S: Serializer>(state: &ItemState, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(state.as_str())
}

fn serialize_seconds<S: Serializer>(elapsed: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match elapsed {
        Some(d) => serializer.serialize_some(&d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

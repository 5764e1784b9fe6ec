//! Item state module - lifecycle of one work item within a run

/// State of a work item during a batch run
///
/// Every item starts `Pending` and ends in exactly one terminal state:
/// - Skipped: a successful row already exists in the checkpoint
/// - Succeeded: a record was extracted and written
/// - Failed: some stage failed and a failure placeholder was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Not yet processed in this run
    Pending,

    /// Already checkpointed, no vendor calls made
    Skipped,

    /// Extracted and written to the checkpoint
    Succeeded,

    /// Failed; eligible for reprocessing on the next run
    Failed,
}

impl ItemState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Skipped => "skipped",
            ItemState::Succeeded => "succeeded",
            ItemState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(ItemState::Failed.to_string(), "failed");
        assert_eq!(ItemState::Skipped.as_str(), "skipped");
    }
}

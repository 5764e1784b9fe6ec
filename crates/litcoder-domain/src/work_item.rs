//! Work item module - one document in a coding job

use std::fmt;
use std::path::{Path, PathBuf};

/// A single document to be coded, identified by a stable name
///
/// The name is the document's file name (e.g. `uebel2025.pdf`). It is the
/// key of the item's row in the checkpoint table, so it must be non-empty
/// and must not contain path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItem(String);

impl WorkItem {
    /// Create a new work item
    ///
    /// # Errors
    /// Returns error if the name is empty or contains a path separator
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err("Work item name cannot be empty".to_string());
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(format!(
                "Work item name '{}' must be a file name, not a path",
                trimmed
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the item name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Path of the document inside `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.0)
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkItem {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

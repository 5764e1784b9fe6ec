//! Error types for the extraction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run or prevent it from starting
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Checkpoint could not be written; fatal to the run
    #[error("Checkpoint error: {0}")]
    Persistence(String),

    /// Job configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prior-stage table could not be loaded
    #[error("Context error: {0}")]
    Context(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}

/// Model output could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Errors that fail a single work item
///
/// Caught at the item boundary and turned into a failure placeholder row;
/// the run continues with the next item.
#[derive(Error, Debug)]
pub enum ItemError {
    /// Document is not in the document directory; no vendor calls made
    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// Vendor rejected the upload
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Generation request failed
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// Response did not contain a usable JSON object
    #[error("JSON parse failed: {0}")]
    Parse(#[from] ParseError),
}

impl ItemError {
    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::MissingFile(_) => "missing_file",
            ItemError::Upload(_) => "upload",
            ItemError::ModelCall(_) => "model_call",
            ItemError::Parse(_) => "parse",
        }
    }
}

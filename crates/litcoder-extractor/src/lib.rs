//! litcoder Extractor
//!
//! Codes a fixed list of documents against a structured-output schema and
//! accumulates the results in a resumable CSV checkpoint.
//!
//! # Overview
//!
//! A job names the documents, the instruction text, the output schema and
//! the checkpoint path. The [`BatchDriver`] walks the items in order, skips
//! those already coded, and for the rest uploads the document, asks the
//! model for a JSON object, repairs and normalizes the response, and writes
//! the record (or a failure placeholder) before moving on.
//!
//! # Architecture
//!
//! ```text
//! JobConfig → BatchDriver → DocumentModel (upload, generate, delete)
//!                 │                 │
//!                 │            normalizer
//!                 ▼                 │
//!          CheckpointTable ◄────────┘
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use litcoder_extractor::{BatchDriver, JobConfig};
//! use litcoder_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = JobConfig::from_file("jobs/sectionD.toml")?.resolve()?;
//! let model = MockProvider::new(r#"{"Country": "United Kingdom"}"#);
//!
//! let mut driver = BatchDriver::new(model, job)?;
//! let summary = driver.run().await?;
//!
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod checkpoint;
mod config;
mod context;
mod driver;
mod error;
pub mod normalizer;
mod status;
mod types;


pub use checkpoint::CheckpointTable;
pub use config::{
    CheckpointLayout, ContextField, ContextSettings, JobConfig, JobSection, JobSpec, ModelSettings,
    PromptSettings,
};
pub use context::PriorStage;
pub use driver::BatchDriver;
pub use error::{ExtractorError, ItemError, ParseError};
pub use normalizer::normalize;
pub use status::{job_status, missing_documents};
pub use types::{ItemReport, ItemStatus, RunSummary, StatusReport};

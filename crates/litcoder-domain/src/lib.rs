//! litcoder Domain Layer
//!
//! Core concepts for coding academic documents with a language model. It has
//! no external dependencies and defines the value types and the vendor
//! boundary that all other crates depend upon.
//!
//! ## Key Concepts
//!
//! - **Work Item**: One document, identified by its file name
//! - **Extraction Record**: Ordered field → value mapping produced for an item
//! - **Item State**: Pending → Skipped / Succeeded / Failed within a run
//! - **DocumentModel**: Upload, generate, delete at the vendor
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Pure value types only
//! - Vendor implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod record;
pub mod state;
pub mod traits;
pub mod work_item;

// Re-exports for convenience
pub use record::{ExtractionRecord, FieldValue};
pub use state::ItemState;
pub use traits::{DocumentModel, GenerationRequest, RemoteDocument};
pub use work_item::WorkItem;

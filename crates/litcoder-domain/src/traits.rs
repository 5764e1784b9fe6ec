//! Trait definitions for external interactions
//!
//! These traits define the boundary between the coding pipeline and the
//! model vendor. Vendor implementations live in `litcoder-llm`.

use std::future::Future;
use std::path::Path;

/// Opaque reference to a document stored on the vendor side
///
/// Produced by [`DocumentModel::upload`] and released by
/// [`DocumentModel::delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    /// Vendor resource name, used for deletion (e.g. `files/abc123`)
    pub name: String,

    /// URI the model request refers to
    pub uri: String,

    /// MIME type declared at upload
    pub mime_type: String,

    /// Local file name the document was uploaded from
    pub display_name: String,
}

/// A single structured-generation request
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Fixed instruction text for the job
    pub instruction: &'a str,

    /// Optional auxiliary context (e.g. a prior stage's coding)
    pub context: Option<&'a str>,

    /// Document the model reads
    pub document: &'a RemoteDocument,

    /// Output schema as JSON text
    pub schema: &'a str,

    /// Sampling temperature; zero asks for the most deterministic output
    pub temperature: f32,
}

/// Vendor boundary: document storage plus structured generation
///
/// Implemented by the infrastructure layer (litcoder-llm). Every call is a
/// single request with no retry; callers decide what a failure means.
pub trait DocumentModel {
    /// Error type for vendor operations
    type Error: std::fmt::Display;

    /// Upload a local file and return a remote reference
    fn upload(&self, path: &Path)
        -> impl Future<Output = Result<RemoteDocument, Self::Error>> + Send;

    /// Generate a response for the request; returns raw response text
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Release a previously uploaded document
    fn delete(&self, document: &RemoteDocument)
        -> impl Future<Output = Result<(), Self::Error>> + Send;
}

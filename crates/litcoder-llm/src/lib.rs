//! litcoder LLM Provider Layer
//!
//! Implementations of the `DocumentModel` trait from `litcoder-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `GeminiProvider`: Google Gemini API (Files API + `generateContent`)
//!
//! # Examples
//!
//! ```
//! use litcoder_llm::MockProvider;
//!
//! let mut provider = MockProvider::new(r#"{"Title": "A study"}"#);
//! provider.add_response("roe2016.pdf", r#"{"Title": "Green space and stress"}"#);
//! assert_eq!(provider.generate_count(), 0);
//! ```

#![warn(missing_docs)]

pub mod gemini;

use litcoder_domain::{DocumentModel, GenerationRequest, RemoteDocument};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use gemini::GeminiProvider;

/// Errors that can occur during vendor operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Document upload rejected or incomplete
    #[error("Upload error: {0}")]
    Upload(String),

    /// Invalid response from the model
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request could not be built (e.g. malformed schema)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Local file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Record of every call a [`MockProvider`] received
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    /// Display names of uploaded documents, in call order
    pub uploads: Vec<String>,

    /// Display names of documents a generation was requested for
    pub generations: Vec<String>,

    /// Remote names of deleted documents
    pub deletions: Vec<String>,

    /// Context text passed with each generation
    pub contexts: Vec<Option<String>>,

    /// Temperature passed with each generation
    pub temperatures: Vec<f32>,
}

/// Mock provider for deterministic testing
///
/// Returns pre-configured responses keyed by document file name without any
/// network calls, and can be told to fail individual stages per document.
///
/// # Examples
///
/// ```
/// use litcoder_llm::MockProvider;
///
/// let mut provider = MockProvider::default();
/// provider.add_response("a.pdf", r#"{"Year": 2020}"#);
/// provider.fail_upload("b.pdf");
/// assert_eq!(provider.upload_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    upload_failures: Arc<Mutex<HashSet<String>>>,
    generate_failures: Arc<Mutex<HashSet<String>>>,
    delete_failures: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<CallLog>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all documents
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            upload_failures: Arc::new(Mutex::new(HashSet::new())),
            generate_failures: Arc::new(Mutex::new(HashSet::new())),
            delete_failures: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Add a specific response for a given document file name
    pub fn add_response(&mut self, document: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(document.into(), response.into());
    }

    /// Make uploads of the given document fail
    pub fn fail_upload(&mut self, document: impl Into<String>) {
        self.upload_failures.lock().unwrap().insert(document.into());
    }

    /// Make generation for the given document fail
    pub fn fail_generate(&mut self, document: impl Into<String>) {
        self.generate_failures.lock().unwrap().insert(document.into());
    }

    /// Make deletion of the given document fail
    pub fn fail_delete(&mut self, document: impl Into<String>) {
        self.delete_failures.lock().unwrap().insert(document.into());
    }

    /// Snapshot of all calls received so far
    pub fn calls(&self) -> CallLog {
        self.calls.lock().unwrap().clone()
    }

    /// Number of upload calls
    pub fn upload_count(&self) -> usize {
        self.calls.lock().unwrap().uploads.len()
    }

    /// Number of generation calls
    pub fn generate_count(&self) -> usize {
        self.calls.lock().unwrap().generations.len()
    }

    /// Number of delete calls
    pub fn delete_count(&self) -> usize {
        self.calls.lock().unwrap().deletions.len()
    }

    /// Reset the call log
    pub fn reset_calls(&self) {
        *self.calls.lock().unwrap() = CallLog::default();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

impl DocumentModel for MockProvider {
    type Error = LlmError;

    async fn upload(&self, path: &Path) -> Result<RemoteDocument, Self::Error> {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.uploads.push(display_name.clone());
            calls.uploads.len()
        };

        if self.upload_failures.lock().unwrap().contains(&display_name) {
            return Err(LlmError::Upload(format!("Mock upload failure for {}", display_name)));
        }

        Ok(RemoteDocument {
            name: format!("files/mock-{}", index),
            uri: format!("mock://files/mock-{}", index),
            mime_type: gemini::mime_type_for(path).to_string(),
            display_name,
        })
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, Self::Error> {
        let document = request.document.display_name.clone();
        {
            let mut calls = self.calls.lock().unwrap();
            calls.generations.push(document.clone());
            calls.contexts.push(request.context.map(str::to_string));
            calls.temperatures.push(request.temperature);
        }

        if self.generate_failures.lock().unwrap().contains(&document) {
            return Err(LlmError::Communication("Mock error".to_string()));
        }

        let responses = self.responses.lock().unwrap();
        Ok(responses
            .get(&document)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }

    async fn delete(&self, document: &RemoteDocument) -> Result<(), Self::Error> {
        self.calls.lock().unwrap().deletions.push(document.name.clone());

        if self.delete_failures.lock().unwrap().contains(&document.display_name) {
            return Err(LlmError::Other("Mock delete failure".to_string()));
        }
        Ok(())
    }
}

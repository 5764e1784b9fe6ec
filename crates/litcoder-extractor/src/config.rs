//! Job configuration
//!
//! A job is one coding pass over a fixed list of documents: which
//! documents, which instruction and output schema, where the checkpoint
//! lives, and optionally which prior stage to draw context from. Jobs are
//! TOML files; relative paths inside them resolve against the file's
//! directory.

use crate::error::ExtractorError;
use litcoder_domain::WorkItem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identifying and error columns of a checkpoint table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointLayout {
    /// Column holding the work item name
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Column flagging failed items
    #[serde(default = "default_error_field")]
    pub error_field: String,

    /// Value written to the error column of a failure placeholder
    #[serde(default = "default_error_marker")]
    pub error_marker: String,
}

impl Default for CheckpointLayout {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            error_field: default_error_field(),
            error_marker: default_error_marker(),
        }
    }
}

/// Documents and output of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSection {
    /// Job name, used in logs and reports
    pub name: String,

    /// Directory holding the documents
    pub document_dir: PathBuf,

    /// Checkpoint CSV path
    pub output: PathBuf,

    /// Ordered, hand-curated document file names
    pub items: Vec<String>,
}

/// Model request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model name; falls back to the user's default when absent
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Fixed delay after each upload (milliseconds)
    #[serde(default = "default_upload_pacing_ms")]
    pub upload_pacing_ms: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            upload_pacing_ms: default_upload_pacing_ms(),
        }
    }
}

/// Instruction and output schema, inline or from files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptSettings {
    /// Inline instruction text
    #[serde(default)]
    pub instruction: Option<String>,

    /// Instruction text file
    #[serde(default)]
    pub instruction_file: Option<PathBuf>,

    /// Inline JSON schema
    #[serde(default)]
    pub schema: Option<String>,

    /// JSON schema file
    #[serde(default)]
    pub schema_file: Option<PathBuf>,
}

/// One prior-stage column rendered into the context text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextField {
    /// Column in the prior table
    pub column: String,

    /// Label shown to the model; the column name when absent
    #[serde(default)]
    pub label: Option<String>,

    /// Column whose value is shown on an indented `Detail:` line
    #[serde(default)]
    pub detail: Option<String>,
}

/// Cross-reference to a prior stage's checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Prior stage's checkpoint CSV
    pub prior_output: PathBuf,

    /// First line of the context text
    pub heading: String,

    /// Text used when the prior table has no successful row for the item
    pub missing_text: String,

    /// Columns to render, in order
    #[serde(default)]
    pub fields: Vec<ContextField>,

    /// Identifying column of the prior table; the job's id field when absent
    #[serde(default)]
    pub id_field: Option<String>,
}

/// A job file as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Documents and output
    pub job: JobSection,

    /// Model request settings
    #[serde(default)]
    pub model: ModelSettings,

    /// Instruction and schema
    #[serde(default)]
    pub prompt: PromptSettings,

    /// Checkpoint columns
    #[serde(default)]
    pub checkpoint: CheckpointLayout,

    /// Optional prior-stage context
    #[serde(default)]
    pub context: Option<ContextSettings>,

    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A validated job with files read and paths resolved
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Job name
    pub name: String,

    /// Ordered work items
    pub items: Vec<WorkItem>,

    /// Directory holding the documents
    pub document_dir: PathBuf,

    /// Checkpoint CSV path
    pub output: PathBuf,

    /// Instruction text
    pub instruction: String,

    /// Output schema as JSON text
    pub schema: String,

    /// Model override, if the job names one
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Delay after each upload
    pub upload_pacing: Duration,

    /// Checkpoint columns
    pub layout: CheckpointLayout,

    /// Prior-stage context, paths resolved
    pub context: Option<ContextSettings>,
}

impl JobConfig {
    /// Load a job file; relative paths resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("Cannot read job file {}: {}", path.display(), e))
        })?;
        let mut config: JobConfig = toml::from_str(&contents)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.job.name.trim().is_empty() {
            return Err("job.name must not be empty".to_string());
        }
        if self.job.items.is_empty() {
            return Err("job.items must list at least one document".to_string());
        }

        let mut seen = HashSet::new();
        for name in &self.job.items {
            let item = WorkItem::new(name.as_str())?;
            if !seen.insert(item.name().to_string()) {
                return Err(format!("job.items lists '{}' more than once", item));
            }
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err("model.temperature must be between 0.0 and 2.0".to_string());
        }

        match (&self.prompt.instruction, &self.prompt.instruction_file) {
            (None, None) => return Err("prompt.instruction or prompt.instruction_file is required".to_string()),
            (Some(_), Some(_)) => return Err("set only one of prompt.instruction and prompt.instruction_file".to_string()),
            _ => {}
        }
        match (&self.prompt.schema, &self.prompt.schema_file) {
            (None, None) => return Err("prompt.schema or prompt.schema_file is required".to_string()),
            (Some(_), Some(_)) => return Err("set only one of prompt.schema and prompt.schema_file".to_string()),
            _ => {}
        }

        let layout = &self.checkpoint;
        if layout.id_field.is_empty() || layout.error_field.is_empty() {
            return Err("checkpoint.id_field and checkpoint.error_field must not be empty".to_string());
        }
        if layout.id_field == layout.error_field {
            return Err("checkpoint.id_field and checkpoint.error_field must differ".to_string());
        }
        if layout.error_marker.is_empty() {
            return Err("checkpoint.error_marker must not be empty".to_string());
        }

        if let Some(context) = &self.context {
            if context.heading.trim().is_empty() {
                return Err("context.heading must not be empty".to_string());
            }
            if context.fields.is_empty() {
                return Err("context.fields must list at least one column".to_string());
            }
        }

        Ok(())
    }

    /// Validate, read instruction and schema files, and resolve paths
    pub fn resolve(&self) -> Result<JobSpec, ExtractorError> {
        self.validate().map_err(ExtractorError::Config)?;

        let instruction = match (&self.prompt.instruction, &self.prompt.instruction_file) {
            (Some(text), _) => text.clone(),
            (None, Some(file)) => self.read_input(file, "instruction")?,
            (None, None) => {
                return Err(ExtractorError::Config(
                    "prompt.instruction or prompt.instruction_file is required".to_string(),
                ))
            }
        };
        if instruction.trim().is_empty() {
            return Err(ExtractorError::Config("Instruction text is empty".to_string()));
        }

        let schema = match (&self.prompt.schema, &self.prompt.schema_file) {
            (Some(text), _) => text.clone(),
            (None, Some(file)) => self.read_input(file, "schema")?,
            (None, None) => {
                return Err(ExtractorError::Config(
                    "prompt.schema or prompt.schema_file is required".to_string(),
                ))
            }
        };
        check_schema(&schema)?;

        let items = self
            .job
            .items
            .iter()
            .map(|name| WorkItem::new(name.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ExtractorError::Config)?;

        let context = self.context.clone().map(|mut context| {
            context.prior_output = self.resolve_path(&context.prior_output);
            context
        });

        Ok(JobSpec {
            name: self.job.name.clone(),
            items,
            document_dir: self.resolve_path(&self.job.document_dir),
            output: self.resolve_path(&self.job.output),
            instruction,
            schema,
            model: self.model.model.clone(),
            temperature: self.model.temperature,
            upload_pacing: Duration::from_millis(self.model.upload_pacing_ms),
            layout: self.checkpoint.clone(),
            context,
        })
    }

    /// Resolve a path against the job file's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn read_input(&self, file: &Path, what: &str) -> Result<String, ExtractorError> {
        let path = self.resolve_path(file);
        fs::read_to_string(&path).map_err(|e| {
            ExtractorError::Config(format!("Cannot read {} file {}: {}", what, path.display(), e))
        })
    }
}

/// The schema must be a JSON object describing an object response
fn check_schema(schema: &str) -> Result<(), ExtractorError> {
    let value: serde_json::Value = serde_json::from_str(schema)
        .map_err(|e| ExtractorError::Config(format!("Schema is not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| ExtractorError::Config("Schema must be a JSON object".to_string()))?;

    match object.get("type").and_then(|t| t.as_str()) {
        Some(t) if t.eq_ignore_ascii_case("object") => Ok(()),
        Some(t) => Err(ExtractorError::Config(format!(
            "Schema must describe an object response, found type '{}'",
            t
        ))),
        None => Err(ExtractorError::Config("Schema has no top-level 'type'".to_string())),
    }
}

fn default_id_field() -> String {
    "File_Name".to_string()
}

fn default_error_field() -> String {
    "ERROR".to_string()
}

fn default_error_marker() -> String {
    "failed_to_extract".to_string()
}

fn default_upload_pacing_ms() -> u64 {
    500
}

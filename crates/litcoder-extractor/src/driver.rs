//! Batch driver: walks a job's items and keeps the checkpoint current

use crate::checkpoint::CheckpointTable;
use crate::config::JobSpec;
use crate::context::PriorStage;
use crate::error::{ExtractorError, ItemError};
use crate::normalizer::normalize;
use crate::types::{ItemReport, RunSummary};
use litcoder_domain::{DocumentModel, ExtractionRecord, GenerationRequest, ItemState, RemoteDocument, WorkItem};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs one job against a document model, strictly one item at a time
///
/// Items already in the checkpoint with a successful row are skipped. Every
/// other item ends as either a record or a failure placeholder, and the
/// table is rewritten after each one, so an interrupted run resumes where
/// it stopped.
pub struct BatchDriver<M: DocumentModel> {
    model: M,
    job: JobSpec,
    checkpoint: CheckpointTable,
    prior: Option<PriorStage>,
}

impl<M: DocumentModel> BatchDriver<M> {
    /// Load the checkpoint and, if configured, the prior stage
    ///
    /// # Errors
    /// Returns `ExtractorError::Context` if the prior-stage table cannot be
    /// read. A missing or unreadable checkpoint is not an error.
    pub fn new(model: M, job: JobSpec) -> Result<Self, ExtractorError> {
        let checkpoint = CheckpointTable::load(&job.output, job.layout.clone());
        let prior = job
            .context
            .as_ref()
            .map(|settings| PriorStage::load(settings, &job.layout))
            .transpose()?;

        Ok(Self {
            model,
            job,
            checkpoint,
            prior,
        })
    }

    /// Current checkpoint table
    pub fn checkpoint(&self) -> &CheckpointTable {
        &self.checkpoint
    }

    /// The job being run
    pub fn job(&self) -> &JobSpec {
        &self.job
    }

    /// Process every item, then save the table once more
    ///
    /// # Errors
    /// Only checkpoint write failures abort the run; item failures become
    /// placeholder rows.
    pub async fn run(&mut self) -> Result<RunSummary, ExtractorError> {
        let items = self.job.items.clone();
        let total = items.len();
        info!(
            "Starting job '{}': {} items, {} rows already in {}",
            self.job.name,
            total,
            self.checkpoint.len(),
            self.job.output.display()
        );

        let mut summary = RunSummary::new(self.job.name.clone(), self.job.output.clone());
        for (index, item) in items.iter().enumerate() {
            let report = self.run_item(index + 1, total, item).await?;
            summary.record(report);
        }

        self.checkpoint.save()?;
        summary.rows_written = self.checkpoint.len();
        info!(
            "Final save complete, {} rows in {}",
            summary.rows_written,
            self.job.output.display()
        );

        Ok(summary)
    }

    async fn run_item(&mut self, position: usize, total: usize, item: &WorkItem) -> Result<ItemReport, ExtractorError> {
        let name = item.name();
        if self.checkpoint.already_has(name) {
            info!("[{}/{}] Skipping {}, already in checkpoint", position, total, name);
            return Ok(ItemReport {
                name: name.to_string(),
                state: ItemState::Skipped,
                elapsed: None,
                error: None,
            });
        }

        info!("[{}/{}] Processing {}", position, total, name);
        let (outcome, elapsed) = self.process_item(item).await;

        let report = match outcome {
            Ok(record) => {
                self.checkpoint.append_and_persist(record)?;
                if let Some(elapsed) = elapsed {
                    info!("Finished {} in {:.2} seconds", name, elapsed.as_secs_f64());
                }
                ItemReport {
                    name: name.to_string(),
                    state: ItemState::Succeeded,
                    elapsed,
                    error: None,
                }
            }
            Err(e) => {
                warn!("{} failed ({}): {}", name, e.kind(), e);
                let layout = self.checkpoint.layout();
                let placeholder =
                    ExtractionRecord::failure(&layout.id_field, name, &layout.error_field, &layout.error_marker);
                self.checkpoint.append_and_persist(placeholder)?;
                ItemReport {
                    name: name.to_string(),
                    state: ItemState::Failed,
                    elapsed,
                    error: Some(e.to_string()),
                }
            }
        };

        info!("Checkpoint saved, current row count {}", self.checkpoint.len());
        Ok(report)
    }

    /// Upload, generate, normalize, and always release the upload
    ///
    /// Elapsed time is only recorded once the upload has succeeded.
    async fn process_item(&self, item: &WorkItem) -> (Result<ExtractionRecord, ItemError>, Option<Duration>) {
        let path = item.path_in(&self.job.document_dir);
        if !path.is_file() {
            return (Err(ItemError::MissingFile(path)), None);
        }

        let start = Instant::now();
        let document = match self.model.upload(&path).await {
            Ok(document) => document,
            Err(e) => return (Err(ItemError::Upload(e.to_string())), None),
        };
        debug!("Uploaded {} as {}", item, document.name);

        if !self.job.upload_pacing.is_zero() {
            tokio::time::sleep(self.job.upload_pacing).await;
        }

        let result = self.extract(item, &document).await;
        self.release(&document).await;

        (result, Some(start.elapsed()))
    }

    async fn extract(&self, item: &WorkItem, document: &RemoteDocument) -> Result<ExtractionRecord, ItemError> {
        let context = self.prior.as_ref().map(|prior| prior.context_for(item.name()));
        let request = GenerationRequest {
            instruction: &self.job.instruction,
            context: context.as_deref(),
            document,
            schema: &self.job.schema,
            temperature: self.job.temperature,
        };

        let raw = self
            .model
            .generate(&request)
            .await
            .map_err(|e| ItemError::ModelCall(e.to_string()))?;
        debug!("Response for {}: {} chars", item, raw.len());

        Ok(normalize(&raw, &self.job.layout.id_field, item.name())?)
    }

    async fn release(&self, document: &RemoteDocument) {
        if let Err(e) = self.model.delete(document).await {
            debug!("Could not delete {}: {}", document.name, e);
        }
    }
}

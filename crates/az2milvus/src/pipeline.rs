//! Migration pipeline orchestration.
//!
//! A run moves one source index into one target collection batch by batch:
//! extract, transform, write, checkpoint. Nothing overlaps between batches,
//! so after a crash at most one batch is re-processed on resume. Keyed rows
//! are upserted, which makes that replay an overwrite.
//!
//! Documents are extracted in ascending key order. Without a key field the
//! source order is unspecified and resume is best-effort: documents at the
//! resume boundary may be duplicated or skipped.

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::checkpoint::{CheckpointManager, CheckpointStatus, MigrationCheckpoint};
use crate::config::{MigrationOptions, MAX_BATCH_SIZE};
use crate::connectors::{ExtractRequest, SourceConnector, TargetSink};
use crate::error::{Error, Result};
use crate::retry::{with_retry, RetryConfig};
use crate::schema_converter::SchemaConversionResult;
use crate::transform::{record_to_json, DataTransformer};

/// Message recorded on the checkpoint when a run is cancelled.
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Progress callback invoked with `(migrated, total)` after every committed batch.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Migration statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MigrationStats {
    /// Documents extracted from the source.
    pub extracted: u64,
    /// Records written to the target (or that would be, in a dry run).
    pub loaded: u64,
    /// Documents dropped during transformation.
    pub rejected: u64,
    /// Batches processed.
    pub batches: u64,
    /// Documents already migrated when the run started.
    pub resumed_from: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationStats {
    /// Calculate throughput (records per second).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.loaded as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Final checkpoint and statistics of a successful run.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    /// Checkpoint in its completed state.
    pub checkpoint: MigrationCheckpoint,
    /// Run statistics.
    pub stats: MigrationStats,
}

/// Cooperative cancellation, checked between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an untripped flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The current batch still completes.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Moves documents from a source index into a target collection.
pub struct DataMigrator {
    options: MigrationOptions,
    conversion: SchemaConversionResult,
    source: Box<dyn SourceConnector>,
    target: Box<dyn TargetSink>,
    transformer: DataTransformer,
    checkpoints: CheckpointManager,
    retry: RetryConfig,
    cancel: CancelFlag,
    progress: Option<ProgressCallback>,
    resume: bool,
}

impl DataMigrator {
    /// Create a migrator for a converted schema.
    ///
    /// The target is connected by [`run`](Self::run) unless the options
    /// request a dry run.
    #[must_use]
    pub fn new(
        options: MigrationOptions,
        conversion: SchemaConversionResult,
        source: Box<dyn SourceConnector>,
        target: Box<dyn TargetSink>,
    ) -> Self {
        let transformer = DataTransformer::new(&conversion.field_conversions);
        let checkpoints = CheckpointManager::new(options.checkpoint_dir.clone());
        let retry = RetryConfig::with_max_retries(options.max_retries);
        Self {
            options,
            conversion,
            source,
            target,
            transformer,
            checkpoints,
            retry,
            cancel: CancelFlag::new(),
            progress: None,
            resume: true,
        }
    }

    /// Set a callback `fn(migrated, total)` for progress reporting.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Use an externally controlled cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override the retry policy for connector calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Whether to resume an in-progress checkpoint (default `true`).
    #[must_use]
    pub const fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Checkpoint store used by this migrator.
    #[must_use]
    pub const fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    fn index_name(&self) -> &str {
        &self.conversion.source_index
    }

    fn collection_name(&self) -> &str {
        &self.conversion.collection_name
    }

    /// Run the migration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the batch size is outside
    /// `1..=MAX_BATCH_SIZE`, [`Error::CheckpointLocked`] if another run holds the index,
    /// [`Error::Cancelled`] if the cancel flag was tripped, or the first
    /// connector error that survived retries. In the last two cases the
    /// checkpoint is saved as failed first.
    pub async fn run(&mut self) -> Result<MigrationOutcome> {
        let start = Instant::now();
        // A service page never exceeds MAX_BATCH_SIZE, so a larger request
        // would look like a short final page and end the run early.
        let batch_size = self.options.batch_size;
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }
        let _lock = self.checkpoints.acquire_lock(self.index_name())?;

        let mut checkpoint = self.resolve_checkpoint().await?;
        let mut stats = MigrationStats {
            resumed_from: checkpoint.migrated_documents,
            ..MigrationStats::default()
        };

        checkpoint.mark_in_progress();
        self.checkpoints.save(&checkpoint)?;

        if self.options.dry_run {
            info!("Dry run: no writes to the target");
        }

        if let Err(e) = self.execute(&mut checkpoint, &mut stats).await {
            let message = if matches!(e, Error::Cancelled) {
                CANCELLED_MESSAGE.to_string()
            } else {
                e.to_string()
            };
            checkpoint.mark_failed(message);
            if let Err(save_err) = self.checkpoints.save(&checkpoint) {
                error!(error = %save_err, "Failed to save failed checkpoint");
            }
            error!(
                index = %checkpoint.index_name,
                migrated = checkpoint.migrated_documents,
                error = %e,
                "Migration failed"
            );
            return Err(e);
        }

        checkpoint.mark_completed();
        self.checkpoints.save(&checkpoint)?;

        if !self.options.dry_run {
            self.target.load_collection(self.collection_name()).await?;
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        info!(
            migrated = checkpoint.migrated_documents,
            total = checkpoint.total_documents,
            rejected = checkpoint.failed_document_keys.len(),
            batches = stats.batches,
            duration_secs = stats.duration_secs,
            throughput = stats.throughput(),
            "Migration complete"
        );

        Ok(MigrationOutcome { checkpoint, stats })
    }

    /// Loads a resumable checkpoint or starts a fresh one.
    async fn resolve_checkpoint(&self) -> Result<MigrationCheckpoint> {
        if self.resume {
            match self.checkpoints.load(self.index_name())? {
                Some(cp) if cp.status == CheckpointStatus::InProgress => {
                    info!(
                        migrated = cp.migrated_documents,
                        total = cp.total_documents,
                        last_key = %cp.last_document_key,
                        "Resuming from checkpoint"
                    );
                    return Ok(cp);
                }
                Some(cp) => {
                    info!(
                        status = cp.status.as_str(),
                        "Previous checkpoint is not resumable; starting over"
                    );
                }
                None => {}
            }
        }

        let index = self.index_name();
        let total = with_retry(&self.retry, "document_count", || {
            self.source.document_count(index)
        })
        .await?;
        Ok(MigrationCheckpoint::new(
            index,
            self.collection_name(),
            total,
        ))
    }

    /// Connects the target and creates the collection and its indexes.
    async fn prepare_target(&mut self) -> Result<()> {
        self.target.connect().await?;

        let name = self.conversion.collection_name.clone();
        if self.options.drop_existing_collection {
            self.target.drop_collection(&name).await?;
        }

        if self.target.has_collection(&name).await? {
            info!(collection = %name, "Collection exists; skipping creation");
            return Ok(());
        }

        let schema = self.conversion.schema.with_auto_id_fallback();
        self.target.create_collection(&name, &schema).await?;

        for ic in &self.conversion.index_conversions {
            self.target
                .create_index(&name, &ic.target_field, &ic.milvus_config)
                .await?;
        }
        Ok(())
    }

    /// Writes one batch of rows to the target collection.
    ///
    /// Keyed rows are upserted and retried: a write that landed before its
    /// response was lost is simply overwritten on replay. Auto-id rows get a
    /// single insert attempt since a replay would store them twice.
    async fn write_batch(&self, keyed: bool, rows: &[Value]) -> Result<u64> {
        let collection = self.collection_name();
        if keyed {
            with_retry(&self.retry, "upsert", || self.target.upsert(collection, rows)).await
        } else {
            self.target.insert(collection, rows).await
        }
    }

    async fn execute(
        &mut self,
        checkpoint: &mut MigrationCheckpoint,
        stats: &mut MigrationStats,
    ) -> Result<()> {
        if !self.options.dry_run {
            self.prepare_target().await?;
        }

        let key_field = self.conversion.primary_key().map(|f| f.source_name.clone());
        if key_field.is_none() {
            warn!("Index has no key field; resume cannot guarantee exactly-once delivery");
        }

        let batch_size = self.options.batch_size;
        let mut request = ExtractRequest {
            offset: checkpoint.migrated_documents,
            after_key: Some(checkpoint.last_document_key.clone()).filter(|k| !k.is_empty()),
            batch_size,
        };

        loop {
            if self.cancel.is_cancelled() {
                warn!(migrated = checkpoint.migrated_documents, "Cancellation requested");
                return Err(Error::Cancelled);
            }

            let index = self.index_name();
            let docs = with_retry(&self.retry, "extract_batch", || {
                self.source
                    .extract_batch(index, key_field.as_deref(), &request)
            })
            .await?;
            if docs.is_empty() {
                break;
            }

            let extracted = docs.len();
            stats.extracted += extracted as u64;
            stats.batches += 1;

            let outcome = self.transformer.transform_batch_detailed(&docs);
            stats.rejected += outcome.rejected.len() as u64;
            checkpoint.failed_document_keys.extend(
                outcome
                    .rejected
                    .iter()
                    .filter_map(|r| r.key.clone()),
            );

            let last_key = docs
                .iter()
                .rev()
                .find_map(|d| self.transformer.document_key(d));
            request.offset += extracted as u64;
            if last_key.is_some() {
                request.after_key.clone_from(&last_key);
            }

            if outcome.records.is_empty() {
                warn!(batch = stats.batches, "Every document in the batch was dropped");
            } else {
                let rows: Vec<Value> = outcome.records.iter().map(record_to_json).collect();
                let count = rows.len() as u64;

                if self.options.dry_run {
                    info!(records = count, "Dry run: transformed batch");
                    stats.loaded += count;
                } else {
                    let written = self.write_batch(key_field.is_some(), &rows).await?;
                    info!(written, "Wrote batch");
                    stats.loaded += written;
                }

                checkpoint.advance(count, last_key.unwrap_or_default());
                self.checkpoints.save(checkpoint)?;

                if let Some(callback) = &self.progress {
                    callback(checkpoint.migrated_documents, checkpoint.total_documents);
                }
            }

            if extracted < batch_size {
                break;
            }
        }

        Ok(())
    }
}

/// Creates a progress bar, or a spinner when the total is unknown.
#[must_use]
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

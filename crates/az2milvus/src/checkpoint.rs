//! Checkpoints for resumable migrations.
//!
//! One JSON file per source index, `<index>.checkpoint.json`, overwritten on
//! every save. A run also holds an OS advisory lock on `<index>.lock` for its
//! whole lifetime so two runs never write the same checkpoint. The kernel
//! drops that lock when the process exits, so a crashed run leaves the file
//! behind but never blocks the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Migration status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// Created, not started.
    #[default]
    Pending,
    /// Batches are being migrated.
    InProgress,
    /// All batches migrated.
    Completed,
    /// Aborted with an error.
    Failed,
}

impl CheckpointStatus {
    /// Snake-case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Persisted progress of one migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationCheckpoint {
    /// Source index.
    pub index_name: String,
    /// Target collection.
    pub collection_name: String,
    /// Documents in the source index when the run started.
    pub total_documents: u64,
    /// Documents written so far.
    pub migrated_documents: u64,
    /// Key of the last source document of the last committed batch.
    pub last_document_key: String,
    /// Keys of documents dropped during transformation.
    pub failed_document_keys: Vec<String>,
    /// Status.
    pub status: CheckpointStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Committed batches.
    pub batch_number: u64,
    /// Failure message.
    pub error_message: String,
}

impl MigrationCheckpoint {
    /// Creates a pending checkpoint.
    pub fn new(
        index_name: impl Into<String>,
        collection_name: impl Into<String>,
        total_documents: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            index_name: index_name.into(),
            collection_name: collection_name.into(),
            total_documents,
            migrated_documents: 0,
            last_document_key: String::new(),
            failed_document_keys: Vec::new(),
            status: CheckpointStatus::Pending,
            created_at: now,
            updated_at: now,
            batch_number: 0,
            error_message: String::new(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Marks the run as started (or resumed).
    pub fn mark_in_progress(&mut self) {
        self.status = CheckpointStatus::InProgress;
        self.touch();
    }

    /// Records a committed batch of `count` documents ending at `last_key`.
    pub fn advance(&mut self, count: u64, last_key: impl Into<String>) {
        self.migrated_documents += count;
        self.last_document_key = last_key.into();
        self.batch_number += 1;
        self.touch();
    }

    /// Marks the run as finished.
    pub fn mark_completed(&mut self) {
        self.status = CheckpointStatus::Completed;
        self.touch();
    }

    /// Marks the run as aborted.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = CheckpointStatus::Failed;
        self.error_message = error.into();
        self.touch();
    }

    /// Migrated share of the total, in percent. Zero when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_pct(&self) -> f64 {
        if self.total_documents == 0 {
            return 0.0;
        }
        self.migrated_documents as f64 / self.total_documents as f64 * 100.0
    }
}

/// Exclusive claim on an index's checkpoint, released on drop.
///
/// The lock file itself is left in place and reused by the next run.
#[derive(Debug)]
pub struct CheckpointLock {
    path: PathBuf,
    _file: File,
}

impl CheckpointLock {
    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Stores checkpoints as JSON files in a directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates a manager rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Checkpoint directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn safe_name(index_name: &str) -> String {
        index_name.replace(['/', '\\'], "_")
    }

    /// Checkpoint file for an index.
    #[must_use]
    pub fn checkpoint_path(&self, index_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.checkpoint.json", Self::safe_name(index_name)))
    }

    /// Lock file for an index.
    #[must_use]
    pub fn lock_path(&self, index_name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", Self::safe_name(index_name)))
    }

    /// Writes the checkpoint, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, checkpoint: &MigrationCheckpoint) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.checkpoint_path(&checkpoint.index_name);
        let json = serde_json::to_string_pretty(checkpoint)?;
        std::fs::write(&path, json)
            .map_err(|e| Error::Checkpoint(format!("write {}: {e}", path.display())))?;
        debug!(
            index = %checkpoint.index_name,
            migrated = checkpoint.migrated_documents,
            status = checkpoint.status.as_str(),
            "Saved checkpoint"
        );
        Ok(path)
    }

    /// Loads the checkpoint for an index, `None` if none was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self, index_name: &str) -> Result<Option<MigrationCheckpoint>> {
        let path = self.checkpoint_path(index_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint = serde_json::from_str(&content)
            .map_err(|e| Error::Checkpoint(format!("parse {}: {e}", path.display())))?;
        Ok(Some(checkpoint))
    }

    /// Removes the checkpoint for an index. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self, index_name: &str) -> Result<()> {
        match std::fs::remove_file(self.checkpoint_path(index_name)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Claims the index for this run.
    ///
    /// A lock file left by a run that died is reclaimed: only a live holder
    /// of the OS lock blocks. The holder's process id is written to the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CheckpointLocked`] if another run holds the lock.
    pub fn acquire_lock(&self, index_name: &str) -> Result<CheckpointLock> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.lock_path(index_name);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(Error::CheckpointLocked {
                    index: index_name.to_string(),
                    path: path.display().to_string(),
                })
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        debug!(index = index_name, path = %path.display(), "Acquired checkpoint lock");
        Ok(CheckpointLock { path, _file: file })
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;

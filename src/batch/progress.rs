//! In-memory progress tracking for batch uploads.
//!
//! One `BatchProgress` record per batch, written concurrently by the workers
//! of that batch and read by the status endpoint. Entries are never evicted;
//! they live for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Lifecycle state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
}

/// Outcome of one file's upload within a batch
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub status: &'static str,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    pub fn success(filename: String, media_id: String) -> Self {
        Self {
            status: "success",
            filename,
            media_id: Some(media_id),
            error: None,
        }
    }

    pub fn failure(filename: String, error: String) -> Self {
        Self {
            status: "error",
            filename,
            media_id: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Progress record for one batch.
///
/// Invariants: `completed == successful + failed`, `completed <= total`,
/// and status flips to `Completed` exactly once, after which the record is
/// no longer mutated.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub successful: usize,
    pub failed: usize,
    pub status: BatchStatus,
    pub results: Vec<UploadResult>,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            successful: 0,
            failed: 0,
            status: BatchStatus::Processing,
            results: Vec::with_capacity(total),
        }
    }

    /// Record one finished task: counters and result append in one step.
    pub fn record(&mut self, result: UploadResult) {
        if result.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.completed += 1;
        self.results.push(result);
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }
}

#[derive(Debug, Error)]
pub enum ProgressStoreError {
    #[error("Batch ID not found")]
    NotFound,
}

/// Process-wide map from batch id to progress record.
///
/// Each entry carries its own lock so concurrent batches never serialize on
/// one another; the outer map lock is held only to look entries up.
#[derive(Default)]
pub struct ProgressStore {
    batches: RwLock<HashMap<String, Arc<Mutex<BatchProgress>>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new batch with a fixed total and zeroed counters.
    ///
    /// Callers must be able to observe the record as soon as this returns,
    /// before any worker has run.
    pub async fn register(&self, batch_id: &str, total: usize) {
        let mut batches = self.batches.write().await;
        batches.insert(
            batch_id.to_string(),
            Arc::new(Mutex::new(BatchProgress::new(total))),
        );
    }

    /// Snapshot the progress of a batch.
    pub async fn get(&self, batch_id: &str) -> Result<BatchProgress, ProgressStoreError> {
        let entry = self.entry(batch_id).await?;
        let progress = entry.lock().await;
        Ok(progress.clone())
    }

    /// Apply a mutation to a batch's record as a single atomic step.
    pub async fn mutate<F>(&self, batch_id: &str, f: F) -> Result<(), ProgressStoreError>
    where
        F: FnOnce(&mut BatchProgress),
    {
        let entry = self.entry(batch_id).await?;
        let mut progress = entry.lock().await;
        f(&mut progress);
        Ok(())
    }

    async fn entry(
        &self,
        batch_id: &str,
    ) -> Result<Arc<Mutex<BatchProgress>>, ProgressStoreError> {
        let batches = self.batches.read().await;
        batches
            .get(batch_id)
            .cloned()
            .ok_or(ProgressStoreError::NotFound)
    }
}

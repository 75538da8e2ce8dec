//! Batch coordination: admission, registration, and the bounded worker pool.
//!
//! `start_batch` registers a progress record and returns immediately; the
//! uploads run on a background task that fans out across a semaphore-bounded
//! pool. The HTTP caller never blocks past registration.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::MediaApi;

use super::progress::{BatchStatus, ProgressStore, UploadResult};
use super::worker::{upload_task, UploadTask};

/// Hard cap on tasks per batch, enforced at admission
pub const MAX_BATCH_SIZE: usize = 500;

/// Default concurrent upload cap per batch
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Which endpoint a batch came from; determines the id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Upload,
    Folder,
}

impl BatchKind {
    fn prefix(&self) -> &'static str {
        match self {
            BatchKind::Upload => "batch",
            BatchKind::Folder => "folder_batch",
        }
    }
}

/// Rejection at batch admission; nothing is registered and no worker runs
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("No image files in request")]
    Empty,
    #[error("Too many images ({0}). Maximum {MAX_BATCH_SIZE} allowed.")]
    TooLarge(usize),
}

/// Batch id: kind prefix + creation time, plus a short random suffix so two
/// batches admitted in the same instant cannot share a record.
fn generate_batch_id(kind: BatchKind) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        kind.prefix(),
        Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

/// Accepts batches of upload tasks and runs them in the background.
pub struct BatchCoordinator {
    client: Arc<dyn MediaApi>,
    store: Arc<ProgressStore>,
    subject_uid: String,
    staging_root: PathBuf,
    max_concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(
        client: Arc<dyn MediaApi>,
        store: Arc<ProgressStore>,
        subject_uid: String,
        staging_root: PathBuf,
        max_concurrency: usize,
    ) -> Self {
        Self {
            client,
            store,
            subject_uid,
            staging_root,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Admit a batch, register its progress record, and start processing.
    ///
    /// Returns the batch id as soon as the record is registered; callers can
    /// observe a valid zeroed record immediately, before any upload finishes.
    pub async fn start_batch(
        &self,
        kind: BatchKind,
        tasks: Vec<UploadTask>,
    ) -> Result<String, AdmissionError> {
        if tasks.is_empty() {
            return Err(AdmissionError::Empty);
        }
        if tasks.len() > MAX_BATCH_SIZE {
            return Err(AdmissionError::TooLarge(tasks.len()));
        }

        let batch_id = generate_batch_id(kind);
        self.store.register(&batch_id, tasks.len()).await;

        info!(
            "📦 Batch {} admitted with {} file(s), up to {} concurrent uploads",
            batch_id,
            tasks.len(),
            self.max_concurrency.min(tasks.len())
        );

        let client = self.client.clone();
        let store = self.store.clone();
        let subject_uid = self.subject_uid.clone();
        let staging_root = self.staging_root.clone();
        let max_concurrency = self.max_concurrency;
        let id = batch_id.clone();

        tokio::spawn(async move {
            process_batch(
                client,
                store,
                subject_uid,
                staging_root,
                id,
                tasks,
                max_concurrency,
            )
            .await;
        });

        Ok(batch_id)
    }
}

/// Run all tasks of one batch through the bounded pool, recording each
/// result as it lands, then flip the batch to completed.
async fn process_batch(
    client: Arc<dyn MediaApi>,
    store: Arc<ProgressStore>,
    subject_uid: String,
    staging_root: PathBuf,
    batch_id: String,
    tasks: Vec<UploadTask>,
    max_concurrency: usize,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.min(tasks.len())));
    let mut uploads = FuturesUnordered::new();

    for task in tasks {
        let filename = task.filename.clone();
        let semaphore = semaphore.clone();
        let client = client.clone();
        let subject_uid = subject_uid.clone();
        let staging_root = staging_root.clone();
        let batch_id = batch_id.clone();

        uploads.push(async move {
            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return UploadResult::failure(
                            task.filename.clone(),
                            "Upload pool closed".to_string(),
                        )
                    }
                };
                upload_task(client.as_ref(), &subject_uid, &staging_root, &batch_id, task).await
            });

            // A panicking worker still counts as one failed task.
            match handle.await {
                Ok(result) => result,
                Err(e) => UploadResult::failure(filename, format!("Upload task failed: {}", e)),
            }
        });
    }

    // Record results in whatever order the pool produces them.
    while let Some(result) = uploads.next().await {
        if store
            .mutate(&batch_id, |progress| progress.record(result))
            .await
            .is_err()
        {
            warn!("Progress record for batch {} disappeared", batch_id);
        }
    }

    if store
        .mutate(&batch_id, |progress| {
            progress.status = BatchStatus::Completed;
        })
        .await
        .is_err()
    {
        warn!("Progress record for batch {} disappeared", batch_id);
    }

    // The per-batch staging dir should be empty by now; removal is best-effort.
    let _ = tokio::fs::remove_dir(staging_root.join(&batch_id)).await;

    info!("✅ Batch {} completed", batch_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::progress::BatchProgress;
    use crate::batch::worker::tests::FakeMediaApi;
    use crate::batch::worker::TaskSource;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;

    fn memory_tasks(n: usize) -> Vec<UploadTask> {
        (0..n)
            .map(|i| UploadTask {
                filename: format!("img_{}.jpg", i),
                source: TaskSource::Memory(vec![0xFF, 0xD8]),
                meta_tags: Vec::new(),
            })
            .collect()
    }

    fn coordinator(
        client: Arc<dyn MediaApi>,
        staging: &Path,
    ) -> (BatchCoordinator, Arc<ProgressStore>) {
        let store = Arc::new(ProgressStore::new());
        let coordinator = BatchCoordinator::new(
            client,
            store.clone(),
            "subj_1".to_string(),
            staging.to_path_buf(),
            DEFAULT_MAX_CONCURRENCY,
        );
        (coordinator, store)
    }

    async fn wait_for_completion(store: &ProgressStore, batch_id: &str) -> BatchProgress {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let progress = store.get(batch_id).await.unwrap();
                if progress.status == BatchStatus::Completed {
                    return progress;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("batch did not complete in time")
    }

    #[tokio::test]
    async fn test_empty_batch_rejected_without_registration() {
        let staging = tempfile::tempdir().unwrap();
        let (coordinator, store) = coordinator(Arc::new(FakeMediaApi::default()), staging.path());

        let err = coordinator
            .start_batch(BatchKind::Upload, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::Empty));

        // Nothing registered: the store stays empty.
        assert!(store.get("batch_0").await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_without_registration() {
        let staging = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeMediaApi::default());
        let (coordinator, _store) = coordinator(api.clone(), staging.path());

        let err = coordinator
            .start_batch(BatchKind::Upload, memory_tasks(MAX_BATCH_SIZE + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::TooLarge(501)));

        // No worker ran.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_runs_to_completion() {
        let staging = tempfile::tempdir().unwrap();
        let (coordinator, store) = coordinator(Arc::new(FakeMediaApi::default()), staging.path());

        let batch_id = coordinator
            .start_batch(BatchKind::Upload, memory_tasks(25))
            .await
            .unwrap();
        assert!(batch_id.starts_with("batch_"));

        let progress = wait_for_completion(&store, &batch_id).await;
        assert_eq!(progress.total, 25);
        assert_eq!(progress.completed, 25);
        assert_eq!(progress.successful, 25);
        assert_eq!(progress.failed, 0);
        assert_eq!(progress.results.len(), 25);
    }

    #[tokio::test]
    async fn test_failed_files_counted_but_batch_completes() {
        let staging = tempfile::tempdir().unwrap();
        let (coordinator, store) =
            coordinator(Arc::new(FakeMediaApi::failing_all()), staging.path());

        let batch_id = coordinator
            .start_batch(BatchKind::Upload, memory_tasks(8))
            .await
            .unwrap();

        let progress = wait_for_completion(&store, &batch_id).await;
        assert_eq!(progress.completed, 8);
        assert_eq!(progress.successful, 0);
        assert_eq!(progress.failed, 8);
        assert_eq!(progress.completed, progress.successful + progress.failed);
    }

    #[tokio::test]
    async fn test_batch_at_size_limit_is_admitted_and_completes() {
        let staging = tempfile::tempdir().unwrap();
        let (coordinator, store) = coordinator(Arc::new(FakeMediaApi::default()), staging.path());

        let batch_id = coordinator
            .start_batch(BatchKind::Upload, memory_tasks(MAX_BATCH_SIZE))
            .await
            .unwrap();

        let progress = wait_for_completion(&store, &batch_id).await;
        assert_eq!(progress.total, MAX_BATCH_SIZE);
        assert_eq!(progress.completed, MAX_BATCH_SIZE);
        assert_eq!(progress.successful, MAX_BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_folder_batch_id_prefix() {
        let staging = tempfile::tempdir().unwrap();
        let (coordinator, store) = coordinator(Arc::new(FakeMediaApi::default()), staging.path());

        let batch_id = coordinator
            .start_batch(BatchKind::Folder, memory_tasks(1))
            .await
            .unwrap();
        assert!(batch_id.starts_with("folder_batch_"));
        wait_for_completion(&store, &batch_id).await;
    }

    #[tokio::test]
    async fn test_batch_ids_unique_within_one_instant() {
        assert_ne!(
            generate_batch_id(BatchKind::Upload),
            generate_batch_id(BatchKind::Upload)
        );
    }

    /// API double whose uploads park until the test releases them.
    struct GatedApi {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl MediaApi for GatedApi {
        async fn create_media(
            &self,
            _path: &Path,
            _meta_tags: &[String],
            _force_training: bool,
        ) -> Result<String> {
            let permit = self.gate.clone().acquire_owned().await?;
            permit.forget();
            Ok("media-gated".to_string())
        }

        async fn associate_media(&self, _media_id: &str, _subject_uid: &str) -> Result<()> {
            Ok(())
        }

        async fn upload_raw(
            &self,
            _content: Vec<u8>,
            _filename: &str,
            _meta_tags: &[String],
            _subject_uid: &str,
        ) -> Result<String> {
            Ok("media-raw".to_string())
        }
    }

    #[tokio::test]
    async fn test_fresh_batch_observable_before_any_completion() {
        let staging = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let (coordinator, store) = coordinator(
            Arc::new(GatedApi { gate: gate.clone() }),
            staging.path(),
        );

        let batch_id = coordinator
            .start_batch(BatchKind::Upload, memory_tasks(3))
            .await
            .unwrap();

        // All workers are parked on the gate: the record must already exist
        // with zeroed counters.
        let progress = store.get(&batch_id).await.unwrap();
        assert_eq!(progress.status, BatchStatus::Processing);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 0);
        assert_eq!(progress.successful, 0);
        assert_eq!(progress.failed, 0);

        gate.add_permits(3);
        let progress = wait_for_completion(&store, &batch_id).await;
        assert_eq!(progress.completed, 3);
    }

    #[tokio::test]
    async fn test_concurrent_batches_do_not_cross_contaminate() {
        let staging = tempfile::tempdir().unwrap();
        let (coordinator, store) = coordinator(Arc::new(FakeMediaApi::default()), staging.path());

        let first = coordinator
            .start_batch(BatchKind::Upload, memory_tasks(12))
            .await
            .unwrap();
        let second = coordinator
            .start_batch(BatchKind::Folder, memory_tasks(7))
            .await
            .unwrap();
        assert_ne!(first, second);

        let first_progress = wait_for_completion(&store, &first).await;
        let second_progress = wait_for_completion(&store, &second).await;

        assert_eq!(first_progress.total, 12);
        assert_eq!(first_progress.completed, 12);
        assert_eq!(second_progress.total, 7);
        assert_eq!(second_progress.completed, 7);
    }
}

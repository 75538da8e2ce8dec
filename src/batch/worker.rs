//! Upload worker: one file per invocation.
//!
//! A worker stages its file (when the content arrived in memory), runs the
//! upload fallback chain against the vision API, and always removes the
//! staging file on the way out. Any fault is converted into a failure
//! `UploadResult`; a worker never propagates an error out of itself.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::MediaApi;

use super::progress::UploadResult;

/// Where a task's bytes come from
#[derive(Debug, Clone)]
pub enum TaskSource {
    /// Content received over HTTP, staged to disk before upload
    Memory(Vec<u8>),
    /// Existing local file (folder uploads); never deleted by the worker
    Path(PathBuf),
}

/// One file's worth of upload work within a batch
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub filename: String,
    pub source: TaskSource,
    pub meta_tags: Vec<String>,
}

/// The historical calling conventions of the vision API, tried in order.
///
/// This is a compatibility shim, not transient-failure retry: each strategy
/// is attempted at most once and the first success wins.
#[derive(Debug, Clone, Copy)]
enum UploadStrategy {
    /// Create media pinned to the training set, then associate
    CreateTrainingThenAssociate,
    /// Create media without the training flag, then associate
    CreateThenAssociate,
    /// Raw byte upload with the subject set at creation time
    RawUpload,
}

const FALLBACK_CHAIN: [UploadStrategy; 3] = [
    UploadStrategy::CreateTrainingThenAssociate,
    UploadStrategy::CreateThenAssociate,
    UploadStrategy::RawUpload,
];

async fn attempt_strategy(
    strategy: UploadStrategy,
    client: &dyn MediaApi,
    subject_uid: &str,
    path: &Path,
    filename: &str,
    meta_tags: &[String],
) -> Result<String> {
    match strategy {
        UploadStrategy::CreateTrainingThenAssociate => {
            let media_id = client.create_media(path, meta_tags, true).await?;
            client.associate_media(&media_id, subject_uid).await?;
            Ok(media_id)
        }
        UploadStrategy::CreateThenAssociate => {
            let media_id = client.create_media(path, meta_tags, false).await?;
            client.associate_media(&media_id, subject_uid).await?;
            Ok(media_id)
        }
        UploadStrategy::RawUpload => {
            let content = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            client
                .upload_raw(content, filename, meta_tags, subject_uid)
                .await
        }
    }
}

/// Run the three-tier fallback chain for one staged file.
///
/// Returns the media id of the first strategy that succeeds. When every
/// strategy fails, only the last attempt's error is reported; earlier causes
/// are discarded.
pub async fn run_fallback_chain(
    client: &dyn MediaApi,
    subject_uid: &str,
    path: &Path,
    filename: &str,
    meta_tags: &[String],
) -> Result<String> {
    let mut last_error = None;

    for strategy in FALLBACK_CHAIN {
        match attempt_strategy(strategy, client, subject_uid, path, filename, meta_tags).await {
            Ok(media_id) => return Ok(media_id),
            Err(e) => {
                debug!("Upload strategy {:?} failed for {}: {}", strategy, filename, e);
                last_error = Some(e);
            }
        }
    }

    let last = last_error.expect("fallback chain is non-empty");
    anyhow::bail!("All upload methods failed. Last error: {}", last)
}

/// Upload one task and report its result.
///
/// In-memory content is written to `staging_root/<batch_id>/<task>/<filename>`,
/// where `<task>` is unique per invocation so two tasks carrying the same
/// filename never share a staging path; the staged file and its directory are
/// removed on every exit path. Path-sourced tasks are uploaded in place.
pub async fn upload_task(
    client: &dyn MediaApi,
    subject_uid: &str,
    staging_root: &Path,
    batch_id: &str,
    task: UploadTask,
) -> UploadResult {
    let UploadTask {
        filename,
        source,
        meta_tags,
    } = task;

    match source {
        TaskSource::Path(path) => {
            match run_fallback_chain(client, subject_uid, &path, &filename, &meta_tags).await {
                Ok(media_id) => UploadResult::success(filename, media_id),
                Err(e) => UploadResult::failure(filename, e.to_string()),
            }
        }
        TaskSource::Memory(content) => {
            let staging_dir = staging_root
                .join(batch_id)
                .join(Uuid::new_v4().simple().to_string());
            let staging_path = staging_dir.join(&filename);

            let staged: Result<()> = async {
                tokio::fs::create_dir_all(&staging_dir)
                    .await
                    .with_context(|| {
                        format!("Failed to create staging dir {}", staging_dir.display())
                    })?;
                tokio::fs::write(&staging_path, &content)
                    .await
                    .with_context(|| {
                        format!("Failed to stage file {}", staging_path.display())
                    })?;
                Ok(())
            }
            .await;

            let result = match staged {
                Ok(()) => {
                    match run_fallback_chain(
                        client,
                        subject_uid,
                        &staging_path,
                        &filename,
                        &meta_tags,
                    )
                    .await
                    {
                        Ok(media_id) => UploadResult::success(filename, media_id),
                        Err(e) => UploadResult::failure(filename, e.to_string()),
                    }
                }
                Err(e) => UploadResult::failure(filename, e.to_string()),
            };

            if let Err(e) = tokio::fs::remove_file(&staging_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove staging file {}: {}",
                        staging_path.display(),
                        e
                    );
                }
            }
            let _ = tokio::fs::remove_dir(&staging_dir).await;

            result
        }
    }
}

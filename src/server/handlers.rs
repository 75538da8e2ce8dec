//! HTTP endpoint handlers: thin dispatch onto the batch subsystem and the
//! vision API client.

use std::path::Path;

use anyhow::Context;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{
    run_fallback_chain, BatchKind, BatchStatus, TaskSource, UploadResult, UploadTask,
};
use crate::description::{extract_fields, DescriptionFields};

use super::error::GatewayError;
use super::AppState;

/// File extensions accepted by the folder upload scan
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

/// Collected multipart content: files plus the effective meta tags.
///
/// Tags come from repeated `meta_tags` fields when present; otherwise every
/// other text field is folded into a `key:value` tag.
struct MultipartUpload {
    files: Vec<(String, Vec<u8>)>,
    meta_tags: Vec<String>,
}

async fn read_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<MultipartUpload, GatewayError> {
    let mut files = Vec::new();
    let mut explicit_tags = Vec::new();
    let mut folded_tags = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let filename = field.file_name().map(|f| f.to_string());
            let content = field
                .bytes()
                .await
                .map_err(|e| GatewayError::BadRequest(format!("Failed to read file field: {}", e)))?
                .to_vec();
            let filename = match filename.filter(|f| !f.is_empty()) {
                Some(f) => f,
                None => return Err(GatewayError::BadRequest("No filename provided".to_string())),
            };
            files.push((filename, content));
        } else if name == "meta_tags" {
            let value = field
                .text()
                .await
                .map_err(|e| GatewayError::BadRequest(format!("Invalid meta_tags field: {}", e)))?;
            explicit_tags.push(value);
        } else {
            let value = field.text().await.unwrap_or_default();
            folded_tags.push(format!("{}:{}", name, value));
        }
    }

    let meta_tags = if explicit_tags.is_empty() {
        folded_tags
    } else {
        explicit_tags
    };

    Ok(MultipartUpload { files, meta_tags })
}

// ============================================================================
// POST /upload
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SingleUploadResponse {
    pub media_id: String,
    pub subject_uid: String,
    pub filename: String,
    pub meta_tags: Vec<String>,
    pub status: String,
}

/// Upload one image synchronously.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingleUploadResponse>, GatewayError> {
    let upload = read_multipart(multipart, "image").await?;
    let (filename, content) = upload
        .files
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::BadRequest("No image file in request".to_string()))?;

    let staging_path = state.staging_root.join(&filename);
    tokio::fs::create_dir_all(&state.staging_root)
        .await
        .context("Failed to create staging directory")?;
    tokio::fs::write(&staging_path, &content)
        .await
        .with_context(|| format!("Failed to stage file {}", staging_path.display()))?;

    let outcome = run_fallback_chain(
        state.media.as_ref(),
        &state.subject_uid,
        &staging_path,
        &filename,
        &upload.meta_tags,
    )
    .await;

    let _ = tokio::fs::remove_file(&staging_path).await;

    let media_id = outcome
        .map_err(|e| GatewayError::Internal(e.context("Failed to upload media")))?;
    info!("📤 Successfully uploaded media: {}", media_id);

    Ok(Json(SingleUploadResponse {
        media_id,
        subject_uid: state.subject_uid.clone(),
        filename,
        meta_tags: upload.meta_tags,
        status: "uploaded successfully".to_string(),
    }))
}

// ============================================================================
// POST /batch-upload and POST /upload-folder
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BatchStartResponse {
    pub batch_id: String,
    pub total_files: usize,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    pub message: String,
}

/// Accept a multipart batch of images and start background processing.
pub async fn batch_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchStartResponse>, GatewayError> {
    let upload = read_multipart(multipart, "images").await?;

    let total_files = upload.files.len();
    let tasks: Vec<UploadTask> = upload
        .files
        .into_iter()
        .map(|(filename, content)| UploadTask {
            filename,
            source: TaskSource::Memory(content),
            meta_tags: upload.meta_tags.clone(),
        })
        .collect();

    let batch_id = state.coordinator.start_batch(BatchKind::Upload, tasks).await?;

    Ok(Json(BatchStartResponse {
        message: format!(
            "Batch upload started. Use /batch-status/{} to check progress.",
            batch_id
        ),
        batch_id,
        total_files,
        status: "processing".to_string(),
        folder_path: None,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FolderUploadRequest {
    pub folder_path: String,
    #[serde(default)]
    pub meta_tags: Vec<String>,
}

/// Scan a local folder (non-recursive) and upload every image in it.
pub async fn upload_folder(
    State(state): State<AppState>,
    Json(request): Json<FolderUploadRequest>,
) -> Result<Json<BatchStartResponse>, GatewayError> {
    let folder = Path::new(&request.folder_path);
    if tokio::fs::metadata(folder).await.is_err() {
        return Err(GatewayError::BadRequest(
            "Folder path does not exist".to_string(),
        ));
    }

    let mut entries = tokio::fs::read_dir(folder)
        .await
        .context("Failed to read folder")?;
    let mut tasks = Vec::new();
    while let Some(entry) = entries.next_entry().await.context("Failed to read folder")? {
        let path = entry.path();
        if path.is_file() && is_image_file(&path) {
            let filename = entry.file_name().to_string_lossy().into_owned();
            tasks.push(UploadTask {
                filename,
                source: TaskSource::Path(path),
                meta_tags: request.meta_tags.clone(),
            });
        }
    }

    if tasks.is_empty() {
        return Err(GatewayError::BadRequest(
            "No image files found in the folder".to_string(),
        ));
    }

    let total_files = tasks.len();
    debug!(
        "Folder scan of {} found {} image file(s)",
        request.folder_path, total_files
    );

    let batch_id = state.coordinator.start_batch(BatchKind::Folder, tasks).await?;

    Ok(Json(BatchStartResponse {
        message: format!(
            "Folder batch upload started for {} images. Use /batch-status/{} to check progress.",
            total_files, batch_id
        ),
        batch_id,
        total_files,
        status: "processing".to_string(),
        folder_path: Some(request.folder_path),
    }))
}

// ============================================================================
// GET /batch-status/{batch_id}
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub batch_id: String,
    pub status: BatchStatus,
    pub total: usize,
    pub completed: usize,
    pub successful: usize,
    pub failed: usize,
    pub progress_percentage: f64,
    pub results: Vec<UploadResult>,
}

/// Report the progress of a batch.
pub async fn batch_status(
    State(state): State<AppState>,
    UrlPath(batch_id): UrlPath<String>,
) -> Result<Json<BatchStatusResponse>, GatewayError> {
    let progress = state.store.get(&batch_id).await?;

    Ok(Json(BatchStatusResponse {
        batch_id,
        status: progress.status,
        total: progress.total,
        completed: progress.completed,
        successful: progress.successful,
        failed: progress.failed,
        progress_percentage: progress.progress_percentage(),
        results: progress.results,
    }))
}

// ============================================================================
// GET /cameras
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CameraSummary {
    pub camera_name: String,
    pub connected: bool,
    /// "Yes" / "No" / "Unknown" depending on the media search probe
    pub footage: &'static str,
    #[serde(flatten)]
    pub fields: DescriptionFields,
}

#[derive(Debug, Serialize)]
pub struct CamerasResponse {
    pub total: usize,
    pub cameras: Vec<CameraSummary>,
}

/// List network cameras with metadata extracted from their descriptions.
pub async fn list_cameras(
    State(state): State<AppState>,
) -> Result<Json<CamerasResponse>, GatewayError> {
    let cameras = state
        .cameras
        .list_cameras()
        .await
        .context("Failed to list network cameras")?;

    let mut summaries = Vec::with_capacity(cameras.len());
    for camera in cameras {
        let footage = match &camera.subject_uid {
            Some(subject_uid) => match state.cameras.subject_has_media(subject_uid).await {
                Ok(true) => "Yes",
                Ok(false) => "No",
                Err(_) => "Unknown",
            },
            None => "Unknown",
        };

        summaries.push(CameraSummary {
            camera_name: camera.display_name(),
            connected: camera.active,
            footage,
            fields: extract_fields(camera.description.as_deref()),
        });
    }

    Ok(Json(CamerasResponse {
        total: summaries.len(),
        cameras: summaries,
    }))
}

// ============================================================================
// GET /health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subject_uid: String,
    pub connection: &'static str,
}

/// Connection health probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        subject_uid: state.subject_uid.clone(),
        connection: "active",
    })
}

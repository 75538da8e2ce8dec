//! Request and response types for the vision API.

use serde::{Deserialize, Serialize};

/// Token response from the API
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
}

/// Single tenant entry from the tenants listing
#[derive(Debug, Deserialize)]
pub(super) struct TenantInfo {
    pub tenant_id: String,
}

/// Response from the current-user tenants endpoint
#[derive(Debug, Deserialize)]
pub(super) struct TenantsResponse {
    pub tenants: Vec<TenantInfo>,
}

/// Media creation / upload response
#[derive(Debug, Deserialize)]
pub(super) struct MediaResponse {
    pub media_id: String,
}

/// Request body for associating media with a subject
#[derive(Debug, Serialize)]
pub(super) struct AssociateMediaRequest {
    pub media_id: String,
}

/// Subject detail returned by the subjects endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectInfo {
    pub subject_uid: String,
}

/// Request body for creating a subject
#[derive(Debug, Serialize)]
pub(super) struct CreateSubjectRequest {
    pub subject_uid: String,
    pub name: String,
    pub consensus: bool,
}

/// A network camera as reported by the tenant camera listing.
///
/// Older deployments report `camera_name`, newer ones only the
/// `network_camera_id`; either may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkCamera {
    #[serde(default)]
    pub camera_name: Option<String>,
    #[serde(default)]
    pub network_camera_id: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub subject_uid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NetworkCamera {
    /// Display name: camera name when present, otherwise the camera id
    pub fn display_name(&self) -> String {
        self.camera_name
            .clone()
            .or_else(|| self.network_camera_id.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Camera listing response; some deployments wrap the list in `data`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum NetworkCamerasResponse {
    Wrapped { data: Vec<NetworkCamera> },
    Bare(Vec<NetworkCamera>),
}

impl NetworkCamerasResponse {
    pub fn into_cameras(self) -> Vec<NetworkCamera> {
        match self {
            NetworkCamerasResponse::Wrapped { data } => data,
            NetworkCamerasResponse::Bare(cameras) => cameras,
        }
    }
}

/// Request body for the media search probe
#[derive(Debug, Serialize)]
pub(super) struct MediaSearchRequest {
    pub subject_uid: String,
    pub size: u32,
}

/// Media search response
#[derive(Debug, Deserialize)]
pub(super) struct MediaSearchResponse {
    #[serde(default)]
    pub media: Vec<serde_json::Value>,
}

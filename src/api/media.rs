//! Media and subject operations against the vision API.
//!
//! These are the three calls the upload fallback chain is built from
//! (`create_media`, `associate_media`, `upload_raw`) plus the subject
//! bootstrap and the media search probe used by the camera listing.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::debug;

use super::client::ApiClient;
use super::types::{
    AssociateMediaRequest, CreateSubjectRequest, MediaResponse, MediaSearchRequest,
    MediaSearchResponse, SubjectInfo,
};

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Serialize meta tags the way the API expects them in form fields
fn meta_tags_field(meta_tags: &[String]) -> Result<String> {
    serde_json::to_string(meta_tags).context("Failed to serialize meta tags")
}

impl ApiClient {
    /// Create a media record from a local file.
    ///
    /// When `force_training` is set the media is pinned to the training set
    /// at creation time; older API deployments reject the flag, which is why
    /// the upload chain retries without it.
    pub async fn create_media(
        &self,
        base_url: &str,
        access_token: &str,
        path: &Path,
        meta_tags: &[String],
        force_training: bool,
    ) -> Result<String> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read media file {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());

        let mut form = Form::new()
            .part("file", Part::bytes(content).file_name(filename))
            .text("meta_tags", meta_tags_field(meta_tags)?);
        if force_training {
            form = form.text("force_set", "training");
        }

        let url = Self::build_url(base_url, "media")?;
        let request = self
            .request(Method::POST, url)
            .header("Authorization", bearer(access_token))
            .multipart(form);

        let body = Self::expect_success(request, "media create").await?;
        let media: MediaResponse =
            serde_json::from_str(&body).context("Failed to parse media response")?;

        debug!("Created media {}", media.media_id);
        Ok(media.media_id)
    }

    /// Associate an existing media record with a subject.
    pub async fn associate_media(
        &self,
        base_url: &str,
        access_token: &str,
        media_id: &str,
        subject_uid: &str,
    ) -> Result<()> {
        let endpoint = format!("subjects/{}/media", subject_uid);
        let url = Self::build_url(base_url, &endpoint)?;
        let request = self
            .request(Method::POST, url)
            .header("Authorization", bearer(access_token))
            .json(&AssociateMediaRequest {
                media_id: media_id.to_string(),
            });

        Self::expect_success(request, "media associate").await?;
        debug!("Associated media {} with subject {}", media_id, subject_uid);
        Ok(())
    }

    /// Upload raw bytes as media, associated with a subject at creation time.
    ///
    /// Legacy calling convention kept as the last rung of the fallback chain.
    pub async fn upload_raw(
        &self,
        base_url: &str,
        access_token: &str,
        content: Vec<u8>,
        filename: &str,
        meta_tags: &[String],
        subject_uid: &str,
    ) -> Result<String> {
        let form = Form::new()
            .part("file", Part::bytes(content).file_name(filename.to_string()))
            .text("meta_tags", meta_tags_field(meta_tags)?)
            .text("subject_uid", subject_uid.to_string());

        let url = Self::build_url(base_url, "media")?;
        let request = self
            .request(Method::POST, url)
            .header("Authorization", bearer(access_token))
            .multipart(form);

        let body = Self::expect_success(request, "raw media upload").await?;
        let media: MediaResponse =
            serde_json::from_str(&body).context("Failed to parse media response")?;

        debug!("Uploaded media {} for subject {}", media.media_id, subject_uid);
        Ok(media.media_id)
    }

    /// Fetch an existing subject by uid.
    pub async fn get_subject(
        &self,
        base_url: &str,
        access_token: &str,
        subject_uid: &str,
    ) -> Result<SubjectInfo> {
        let endpoint = format!("subjects/{}", subject_uid);
        let url = Self::build_url(base_url, &endpoint)?;
        let request = self
            .request(Method::GET, url)
            .header("Authorization", bearer(access_token));

        let body = Self::expect_success(request, "subject lookup").await?;
        serde_json::from_str(&body).context("Failed to parse subject response")
    }

    /// Create the training subject.
    pub async fn create_subject(
        &self,
        base_url: &str,
        access_token: &str,
        subject_uid: &str,
        name: &str,
    ) -> Result<SubjectInfo> {
        let url = Self::build_url(base_url, "subjects")?;
        let request = self
            .request(Method::POST, url)
            .header("Authorization", bearer(access_token))
            .json(&CreateSubjectRequest {
                subject_uid: subject_uid.to_string(),
                name: name.to_string(),
                consensus: true,
            });

        let body = Self::expect_success(request, "subject create").await?;
        serde_json::from_str(&body).context("Failed to parse subject response")
    }

    /// Probe whether a subject has any associated media at all.
    pub async fn subject_has_media(
        &self,
        base_url: &str,
        access_token: &str,
        subject_uid: &str,
    ) -> Result<bool> {
        let url = Self::build_url(base_url, "media/search")?;
        let request = self
            .request(Method::POST, url)
            .header("Authorization", bearer(access_token))
            .json(&MediaSearchRequest {
                subject_uid: subject_uid.to_string(),
                size: 1,
            });

        let body = Self::expect_success(request, "media search").await?;
        let search: MediaSearchResponse =
            serde_json::from_str(&body).context("Failed to parse media search response")?;
        Ok(!search.media.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_tags_field() {
        let tags = vec!["kitchen:north".to_string(), "line:3".to_string()];
        assert_eq!(
            meta_tags_field(&tags).unwrap(),
            r#"["kitchen:north","line:3"]"#
        );
        assert_eq!(meta_tags_field(&[]).unwrap(), "[]");
    }
}

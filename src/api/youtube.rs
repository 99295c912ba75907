use crate::error::PipelineError;
use crate::{logi, logok};
use anyhow::{Context, Result};
use mime_guess::MimeGuess;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_CATEGORY_ID: &str = "22";
pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    Private,
    /// Reachable by direct link only.
    #[default]
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl std::str::FromStr for PrivacyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "private" => Ok(PrivacyStatus::Private),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            other => Err(format!("unknown privacy status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
    pub made_for_kids: bool,
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            title: "Untitled Video".to_string(),
            description: String::new(),
            tags: default_tags(),
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            privacy: PrivacyStatus::Unlisted,
            made_for_kids: false,
        }
    }
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    fn request_body(&self) -> serde_json::Value {
        json!({
            "snippet": {
                "categoryId": self.category_id,
                "description": self.description,
                "title": self.title,
                "tags": self.tags,
            },
            "status": {
                "privacyStatus": self.privacy.as_str(),
                "selfDeclaredMadeForKids": self.made_for_kids,
            }
        })
    }
}

pub fn default_tags() -> Vec<String> {
    ["api", "upload", "automated"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedVideo {
    pub video_id: String,
    pub video_url: String,
}

impl UploadedVideo {
    pub fn from_id(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let video_url = format!("https://www.youtube.com/watch?v={video_id}");
        Self {
            video_id,
            video_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

/// Resumable-protocol uploader for the YouTube Data API.
pub struct YouTubeUploader {
    client: Client,
    base_url: String,
}

impl YouTubeUploader {
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn upload(
        &self,
        access_token: &str,
        path: &Path,
        meta: &VideoMetadata,
    ) -> Result<UploadedVideo> {
        let bytes = match fs::read(path).await {
            Ok(b) => b,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::FileNotFound(path.display().to_string()).into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let mime = video_mime_type(path);

        logi(format!(
            "Starting upload of {} ({} bytes)... this may take a while",
            path.display(),
            bytes.len()
        ));

        let session_url = format!(
            "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.base_url
        );
        let resp = self
            .client
            .post(session_url)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", mime)
            .header("X-Upload-Content-Length", bytes.len().to_string())
            .json(&meta.request_body())
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .context("YouTube upload session request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Http {
                service: "YouTube",
                status: status.as_u16(),
                body: body.chars().take(800).collect(),
            }
            .into());
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Upload("no resumable session location".to_string()))?;

        let resp = self
            .client
            .put(&location)
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, mime)
            .body(bytes)
            .timeout(Duration::from_secs(3_600))
            .send()
            .await
            .context("YouTube media upload failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PipelineError::Http {
                service: "YouTube",
                status: status.as_u16(),
                body: raw.chars().take(800).collect(),
            }
            .into());
        }

        let resource: VideoResource =
            serde_json::from_str(&raw).context("Failed to parse YouTube upload response")?;
        let video = UploadedVideo::from_id(resource.id);

        logok("Upload successful!");
        logi(format!("Video title: {}", meta.title));
        logi(format!("Video ID: {}", video.video_id));
        logi(format!("Video URL: {}", video.video_url));
        Ok(video)
    }
}

/// Content type announced for the upload session, from the file extension.
pub fn video_mime_type(path: &Path) -> &'static str {
    MimeGuess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

use crate::api::youtube::{UploadedVideo, VideoMetadata, YouTubeUploader};
use crate::config::Config;
use crate::error::PipelineError;
use crate::oauth::{CredentialManager, GoogleAuthorizer, TokenStore};
use crate::logi;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;

/// Publishes finished videos. Shared by the CLI and the web interface.
#[async_trait]
pub trait VideoPublisher: Send + Sync {
    async fn publish(&self, path: &Path, meta: &VideoMetadata) -> Result<UploadedVideo>;

    /// Discards any stored credential and runs the consent flow again.
    async fn reauthenticate(&self) -> Result<()>;
}

pub struct YouTubePublisher {
    credentials: CredentialManager,
    uploader: YouTubeUploader,
}

impl YouTubePublisher {
    pub fn new(credentials: CredentialManager, uploader: YouTubeUploader) -> Self {
        Self {
            credentials,
            uploader,
        }
    }

    pub fn from_config(client: Client, cfg: &Config) -> Self {
        let authorizer = GoogleAuthorizer::new(
            client.clone(),
            &cfg.client_secrets_file,
            cfg.oauth_redirect_port,
        );
        let credentials =
            CredentialManager::new(TokenStore::new(&cfg.token_file), Arc::new(authorizer));
        let uploader = YouTubeUploader::with_base_url(client, &cfg.youtube_base_url);
        Self::new(credentials, uploader)
    }
}

#[async_trait]
impl VideoPublisher for YouTubePublisher {
    async fn publish(&self, path: &Path, meta: &VideoMetadata) -> Result<UploadedVideo> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(PipelineError::FileNotFound(path.display().to_string()).into());
        }
        let credential = self.credentials.obtain().await?;
        logi(format!("Preparing to upload: {}", path.display()));
        self.uploader
            .upload(&credential.access_token, path, meta)
            .await
    }

    async fn reauthenticate(&self) -> Result<()> {
        self.credentials.reauthenticate().await?;
        Ok(())
    }
}

//! OAuth2 credential lifecycle for the upload API.
//!
//! A persisted credential is classified into one of four states and driven
//! to `Valid`:
//!
//! | state                  | action                                    |
//! |------------------------|-------------------------------------------|
//! | `Absent`               | interactive consent, persist              |
//! | `Valid`                | use as-is                                 |
//! | `ExpiredRefreshable`   | refresh (consent if rejected), persist    |
//! | `ExpiredUnrefreshable` | interactive consent, persist              |

use crate::api::youtube::UPLOAD_SCOPE;
use crate::error::PipelineError;
use crate::platform;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::Router;
use axum::extract::Query;
use axum::response::Html;
use axum::routing::get;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;
use tokio::sync::oneshot;
use url::Url;

const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self.expires_at > now + ChronoDuration::seconds(EXPIRY_SKEW_SECS)
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    Absent,
    Valid(Credential),
    ExpiredRefreshable(Credential),
    ExpiredUnrefreshable(Credential),
}

impl CredentialState {
    pub fn classify(credential: Option<Credential>, now: DateTime<Utc>) -> Self {
        match credential {
            None => CredentialState::Absent,
            Some(c) if c.is_valid_at(now) => CredentialState::Valid(c),
            Some(c) if c.can_refresh() => CredentialState::ExpiredRefreshable(c),
            Some(c) => CredentialState::ExpiredUnrefreshable(c),
        }
    }
}

/// JSON file holding the last issued credential.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Option<Credential> {
        let text = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&text) {
            Ok(c) => Some(c),
            Err(err) => {
                logw(format!("Ignoring unreadable token {}: {}", self.path.display(), err));
                None
            }
        }
    }

    pub async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(credential)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write token {}", self.path.display()))
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove token {}", self.path.display())),
        }
    }
}

/// The two ways of getting a fresh credential from the provider.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;
    async fn consent(&self) -> Result<Credential>;
}

pub struct CredentialManager {
    store: TokenStore,
    authorizer: Arc<dyn Authorizer>,
}

impl CredentialManager {
    pub fn new(store: TokenStore, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Load, validate, refresh or re-consent, then persist.
    pub async fn obtain(&self) -> Result<Credential> {
        let state = CredentialState::classify(self.store.load().await, Utc::now());

        let fresh = match state {
            CredentialState::Valid(c) => {
                logok(format!("Using stored credential ({})", self.store.path().display()));
                return Ok(c);
            }
            CredentialState::ExpiredRefreshable(c) => {
                logi("Stored credential expired; refreshing...");
                match self.authorizer.refresh(&c).await {
                    Ok(fresh) => fresh,
                    Err(err) => {
                        logw(format!("Refresh failed ({err}); starting consent flow."));
                        self.authorizer.consent().await?
                    }
                }
            }
            CredentialState::ExpiredUnrefreshable(_) => {
                logi("Stored credential expired without refresh token; starting consent flow...");
                self.authorizer.consent().await?
            }
            CredentialState::Absent => {
                logi("No stored credential; starting consent flow...");
                self.authorizer.consent().await?
            }
        };

        self.store.save(&fresh).await?;
        logok(format!("Credential saved to {}", self.store.path().display()));
        Ok(fresh)
    }

    /// Drops the stored credential so the next lifecycle run asks for consent.
    pub async fn reauthenticate(&self) -> Result<Credential> {
        self.store.clear().await?;
        self.obtain().await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|_| PipelineError::MissingClientSecrets(path.display().to_string()))?;
        Self::parse(&text).with_context(|| format!("Invalid client secrets {}", path.display()))
    }

    /// Accepts the downloaded `{"installed": {...}}` / `{"web": {...}}` layout.
    pub fn parse(text: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(text)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| anyhow::anyhow!("expected an \"installed\" or \"web\" section"))
    }

    pub fn consent_url(&self, redirect_uri: &str, state: &str, scopes: &[String]) -> Result<Url> {
        let mut url = Url::parse(&self.auth_uri).context("invalid auth_uri")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3_600
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Presents the consent URL to the user. Called once the redirect listener
/// is accepting connections.
pub type UrlOpener = Arc<dyn Fn(&Url) + Send + Sync>;

/// Installed-app flow against Google's OAuth endpoints.
pub struct GoogleAuthorizer {
    client: Client,
    secrets_path: PathBuf,
    redirect_port: u16,
    scopes: Vec<String>,
    opener: UrlOpener,
}

impl GoogleAuthorizer {
    pub fn new(client: Client, secrets_path: impl Into<PathBuf>, redirect_port: u16) -> Self {
        Self {
            client,
            secrets_path: secrets_path.into(),
            redirect_port,
            scopes: vec![UPLOAD_SCOPE.to_string()],
            opener: Arc::new(|url: &Url| platform::open_url(url.as_str())),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Replaces the desktop browser launch.
    pub fn with_opener(mut self, opener: impl Fn(&Url) + Send + Sync + 'static) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    async fn token_request(
        &self,
        secrets: &ClientSecrets,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let resp = self
            .client
            .post(&secrets.token_uri)
            .form(params)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .context("token endpoint request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PipelineError::Http {
                service: "OAuth token endpoint",
                status: status.as_u16(),
                body: raw.chars().take(400).collect(),
            }
            .into());
        }
        serde_json::from_str(&raw).context("Failed to parse token response")
    }

    fn credential_from(&self, token: TokenResponse, previous_refresh: Option<String>) -> Credential {
        let scopes = match token.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.scopes.clone(),
        };
        Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(previous_refresh),
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
            scopes,
        }
    }

    async fn wait_for_redirect(&self, auth_url: &Url) -> Result<CallbackParams> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", self.redirect_port))
            .await
            .with_context(|| format!("Failed to bind redirect port {}", self.redirect_port))?;

        let (params_tx, params_rx) = oneshot::channel::<CallbackParams>();
        let params_tx = Arc::new(Mutex::new(Some(params_tx)));
        let callback = move |Query(params): Query<CallbackParams>| {
            let params_tx = Arc::clone(&params_tx);
            async move {
                if let Some(tx) = params_tx.lock().ok().and_then(|mut guard| guard.take()) {
                    let _ = tx.send(params);
                }
                Html("The authentication flow has completed. You may close this window.")
            }
        };
        let app = Router::new().route("/", get(callback));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        logi(format!("Please visit this URL to authorize this application: {auth_url}"));
        (self.opener)(auth_url);

        let params = params_rx
            .await
            .map_err(|_| PipelineError::Consent("redirect listener closed".to_string()));
        let _ = shutdown_tx.send(());
        let _ = server.await;
        Ok(params?)
    }
}

#[async_trait]
impl Authorizer for GoogleAuthorizer {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| PipelineError::RefreshRejected("no refresh token".to_string()))?;
        let secrets = ClientSecrets::load(&self.secrets_path).await?;

        let token = self
            .token_request(
                &secrets,
                &[
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await
            .map_err(|err| PipelineError::RefreshRejected(err.to_string()))?;

        logok("Access token refreshed.");
        Ok(self.credential_from(token, Some(refresh_token.to_string())))
    }

    async fn consent(&self) -> Result<Credential> {
        let secrets = ClientSecrets::load(&self.secrets_path).await?;
        let redirect_uri = format!("http://localhost:{}/", self.redirect_port);
        let state = uuid::Uuid::new_v4().to_string();
        let auth_url = secrets.consent_url(&redirect_uri, &state, &self.scopes)?;

        let params = self.wait_for_redirect(&auth_url).await?;
        if let Some(error) = params.error {
            return Err(PipelineError::Consent(error).into());
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(PipelineError::Consent("state mismatch".to_string()).into());
        }
        let code = params
            .code
            .ok_or_else(|| PipelineError::Consent("no authorization code".to_string()))?;

        let token = self
            .token_request(
                &secrets,
                &[
                    ("code", code.as_str()),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        logok("OAuth flow completed successfully!");
        Ok(self.credential_from(token, None))
    }
}

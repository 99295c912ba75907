mod common;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{Reply, Stub};
use serde_json::json;
use shorts_pipeline::PipelineError;
use url::Url;
use shorts_pipeline::oauth::{Authorizer, Credential, CredentialManager, GoogleAuthorizer, TokenStore};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

fn credential(access: &str, refresh: Option<&str>, expires_in_secs: i64) -> Credential {
    Credential {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        scopes: vec!["https://www.googleapis.com/auth/youtube.upload".to_string()],
    }
}

#[derive(Default)]
struct CountingAuthorizer {
    refreshes: AtomicUsize,
    consents: AtomicUsize,
    reject_refresh: bool,
}

impl CountingAuthorizer {
    fn rejecting() -> Self {
        Self {
            reject_refresh: true,
            ..Self::default()
        }
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.refreshes.load(Ordering::SeqCst),
            self.consents.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl Authorizer for CountingAuthorizer {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.reject_refresh {
            return Err(PipelineError::RefreshRejected("invalid_grant".to_string()).into());
        }
        Ok(Credential {
            access_token: "refreshed".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            ..credential.clone()
        })
    }

    async fn consent(&self) -> Result<Credential> {
        self.consents.fetch_add(1, Ordering::SeqCst);
        Ok(credential("consented", Some("r-new"), 3_600))
    }
}

async fn manager_with(
    stored: Option<Credential>,
    authorizer: Arc<CountingAuthorizer>,
) -> (tempfile::TempDir, TokenStore, CredentialManager) {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    if let Some(c) = stored {
        store.save(&c).await.unwrap();
    }
    let manager = CredentialManager::new(store.clone(), authorizer);
    (dir, store, manager)
}

#[tokio::test]
async fn valid_credential_is_used_without_provider_calls() {
    let auth = Arc::new(CountingAuthorizer::default());
    let stored = credential("still-good", Some("r"), 3_600);
    let (_dir, store, manager) = manager_with(Some(stored.clone()), auth.clone()).await;

    let before = std::fs::metadata(store.path()).unwrap().modified().unwrap();
    let got = manager.obtain().await.unwrap();
    assert_eq!(got, stored);
    assert_eq!(auth.counts(), (0, 0));
    let after = std::fs::metadata(store.path()).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn absent_credential_runs_consent_and_persists() {
    let auth = Arc::new(CountingAuthorizer::default());
    let (_dir, store, manager) = manager_with(None, auth.clone()).await;

    let got = manager.obtain().await.unwrap();
    assert_eq!(got.access_token, "consented");
    assert_eq!(auth.counts(), (0, 1));
    assert_eq!(store.load().await.unwrap(), got);
}

#[tokio::test]
async fn expired_credential_with_refresh_token_is_refreshed() {
    let auth = Arc::new(CountingAuthorizer::default());
    let (_dir, store, manager) =
        manager_with(Some(credential("old", Some("r-1"), -10)), auth.clone()).await;

    let got = manager.obtain().await.unwrap();
    assert_eq!(got.access_token, "refreshed");
    assert_eq!(got.refresh_token.as_deref(), Some("r-1"));
    assert_eq!(auth.counts(), (1, 0));
    assert_eq!(store.load().await.unwrap().access_token, "refreshed");
}

#[tokio::test]
async fn credential_inside_expiry_skew_counts_as_expired() {
    let auth = Arc::new(CountingAuthorizer::default());
    let (_dir, _store, manager) =
        manager_with(Some(credential("almost", Some("r-1"), 30)), auth.clone()).await;

    manager.obtain().await.unwrap();
    assert_eq!(auth.counts(), (1, 0));
}

#[tokio::test]
async fn expired_without_refresh_token_runs_consent() {
    let auth = Arc::new(CountingAuthorizer::default());
    let (_dir, _store, manager) =
        manager_with(Some(credential("old", None, -10)), auth.clone()).await;

    let got = manager.obtain().await.unwrap();
    assert_eq!(got.access_token, "consented");
    assert_eq!(auth.counts(), (0, 1));
}

#[tokio::test]
async fn rejected_refresh_falls_back_to_consent() {
    let auth = Arc::new(CountingAuthorizer::rejecting());
    let (_dir, store, manager) =
        manager_with(Some(credential("old", Some("revoked"), -10)), auth.clone()).await;

    let got = manager.obtain().await.unwrap();
    assert_eq!(got.access_token, "consented");
    assert_eq!(auth.counts(), (1, 1));
    assert_eq!(store.load().await.unwrap().refresh_token.as_deref(), Some("r-new"));
}

#[tokio::test]
async fn reauthenticate_ignores_a_valid_token() {
    let auth = Arc::new(CountingAuthorizer::default());
    let (_dir, _store, manager) =
        manager_with(Some(credential("still-good", Some("r"), 3_600)), auth.clone()).await;

    let got = manager.reauthenticate().await.unwrap();
    assert_eq!(got.access_token, "consented");
    assert_eq!(auth.counts(), (0, 1));
}

#[tokio::test]
async fn garbage_token_file_is_treated_as_absent() {
    let auth = Arc::new(CountingAuthorizer::default());
    let (_dir, store, manager) = manager_with(None, auth.clone()).await;
    std::fs::write(store.path(), "not json").unwrap();

    manager.obtain().await.unwrap();
    assert_eq!(auth.counts(), (0, 1));
}

fn write_secrets(dir: &std::path::Path, token_uri: &str) -> std::path::PathBuf {
    let path = dir.join("client_secret.json");
    let secrets = json!({
        "installed": {
            "client_id": "cid",
            "client_secret": "csecret",
            "auth_uri": "https://accounts.example/auth",
            "token_uri": token_uri,
        }
    });
    std::fs::write(&path, secrets.to_string()).unwrap();
    path
}

#[tokio::test]
async fn google_refresh_keeps_previous_refresh_token() {
    let stub = Stub::start(|req, _| {
        if req.path() == "/token" && req.text().contains("grant_type=refresh_token") {
            Reply::json(200, json!({"access_token": "ya29.new", "expires_in": 3599}))
        } else {
            Reply::json(400, json!({"error": "invalid_request"}))
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let secrets = write_secrets(dir.path(), &format!("{}/token", stub.base_url));

    let authorizer = GoogleAuthorizer::new(reqwest::Client::new(), secrets, 0);
    let fresh = authorizer
        .refresh(&credential("ya29.old", Some("1//refresh"), -10))
        .await
        .unwrap();

    assert_eq!(fresh.access_token, "ya29.new");
    assert_eq!(fresh.refresh_token.as_deref(), Some("1//refresh"));
    assert!(fresh.expires_at > Utc::now() + Duration::minutes(50));

    let form = stub.requests()[0].text();
    assert!(form.contains("client_id=cid"));
    assert!(form.contains("client_secret=csecret"));
}

#[tokio::test]
async fn google_refresh_rejection_is_typed() {
    let stub = Stub::start(|_, _| Reply::json(400, json!({"error": "invalid_grant"})));
    let dir = tempfile::tempdir().unwrap();
    let secrets = write_secrets(dir.path(), &format!("{}/token", stub.base_url));

    let authorizer = GoogleAuthorizer::new(reqwest::Client::new(), secrets, 0);
    let err = authorizer
        .refresh(&credential("old", Some("revoked"), -10))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::RefreshRejected(_))
    ));
}

#[tokio::test]
async fn consent_without_client_secrets_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let authorizer =
        GoogleAuthorizer::new(reqwest::Client::new(), dir.path().join("client_secret.json"), 0);
    let err = authorizer.consent().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingClientSecrets(_))
    ));
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn query_value(url: &Url, key: &str) -> String {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// Stands in for the browser: records the consent URL, then follows the
/// redirect with the query built by `answer` from the issued state.
fn browser(
    port: u16,
    seen: Arc<Mutex<Option<Url>>>,
    answer: fn(&str) -> String,
) -> impl Fn(&Url) + Send + Sync + 'static {
    move |auth_url: &Url| {
        *seen.lock().unwrap() = Some(auth_url.clone());
        let target = format!("http://127.0.0.1:{port}/?{}", answer(&query_value(auth_url, "state")));
        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
    }
}

fn token_stub() -> Stub {
    Stub::start(|req, _| {
        let form = req.text();
        if form.contains("grant_type=authorization_code") && form.contains("code=4%2Fgood-code") {
            Reply::json(200, json!({"access_token": "ya29.consented", "refresh_token": "1//fresh", "expires_in": 3599}))
        } else {
            Reply::json(400, json!({"error": "invalid_grant"}))
        }
    })
}

fn consent_error(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Consent(reason)) => Some(reason.clone()),
        _ => None,
    }
}

#[tokio::test]
async fn consent_exchanges_code_when_state_matches() {
    let stub = token_stub();
    let dir = tempfile::tempdir().unwrap();
    let secrets = write_secrets(dir.path(), &format!("{}/token", stub.base_url));
    let port = free_port();
    let seen = Arc::new(Mutex::new(None));

    let scopes = vec!["scope-a".to_string(), "scope-b".to_string()];
    let authorizer = GoogleAuthorizer::new(reqwest::Client::new(), secrets, port)
        .with_scopes(scopes.clone())
        .with_opener(browser(port, seen.clone(), |state| format!("code=4%2Fgood-code&state={state}")));
    let credential = authorizer.consent().await.unwrap();

    assert_eq!(credential.access_token, "ya29.consented");
    assert_eq!(credential.refresh_token.as_deref(), Some("1//fresh"));
    assert_eq!(credential.scopes, scopes);

    let auth_url = seen.lock().unwrap().clone().unwrap();
    assert_eq!(query_value(&auth_url, "client_id"), "cid");
    assert_eq!(query_value(&auth_url, "scope"), "scope-a scope-b");
    assert_eq!(query_value(&auth_url, "redirect_uri"), format!("http://localhost:{port}/"));

    let form = stub.requests()[0].text();
    assert!(form.contains("client_secret=csecret"));
    assert!(form.contains(&format!("redirect_uri=http%3A%2F%2Flocalhost%3A{port}%2F")));
}

#[tokio::test]
async fn consent_rejects_mismatched_state() {
    let stub = token_stub();
    let dir = tempfile::tempdir().unwrap();
    let secrets = write_secrets(dir.path(), &format!("{}/token", stub.base_url));
    let port = free_port();

    let authorizer = GoogleAuthorizer::new(reqwest::Client::new(), secrets, port).with_opener(
        browser(port, Arc::default(), |_| "code=4%2Fgood-code&state=forged".to_string()),
    );
    let err = authorizer.consent().await.unwrap_err();

    assert_eq!(consent_error(&err).as_deref(), Some("state mismatch"));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn consent_reports_provider_error() {
    let stub = token_stub();
    let dir = tempfile::tempdir().unwrap();
    let secrets = write_secrets(dir.path(), &format!("{}/token", stub.base_url));
    let port = free_port();

    let authorizer = GoogleAuthorizer::new(reqwest::Client::new(), secrets, port).with_opener(
        browser(port, Arc::default(), |state| format!("error=access_denied&state={state}")),
    );
    let err = authorizer.consent().await.unwrap_err();

    assert_eq!(consent_error(&err).as_deref(), Some("access_denied"));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn consent_without_code_fails() {
    let stub = token_stub();
    let dir = tempfile::tempdir().unwrap();
    let secrets = write_secrets(dir.path(), &format!("{}/token", stub.base_url));
    let port = free_port();

    let authorizer = GoogleAuthorizer::new(reqwest::Client::new(), secrets, port)
        .with_opener(browser(port, Arc::default(), |state| format!("state={state}")));
    let err = authorizer.consent().await.unwrap_err();

    assert_eq!(consent_error(&err).as_deref(), Some("no authorization code"));
    assert!(stub.requests().is_empty());
}

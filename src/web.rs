use crate::api::youtube::VideoMetadata;
use crate::upload::VideoPublisher;
use crate::{logi, logw};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use html_escape::encode_text;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;

pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "wmv", "flv", "mkv"];
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;
const DEFAULT_TITLE: &str = "Untitled Video";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    fn css(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Clone)]
pub struct AppState {
    publisher: Arc<dyn VideoPublisher>,
    upload_folder: PathBuf,
    flashes: Arc<Mutex<Vec<Flash>>>,
}

impl AppState {
    pub fn new(publisher: Arc<dyn VideoPublisher>, upload_folder: impl Into<PathBuf>) -> Self {
        Self {
            publisher,
            upload_folder: upload_folder.into(),
            flashes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn flash(&self, kind: FlashKind, message: impl Into<String>) {
        let mut guard = self.flashes.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(Flash {
            kind,
            message: message.into(),
        });
    }

    fn take_flashes(&self) -> Vec<Flash> {
        std::mem::take(&mut *self.flashes.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/authenticate", get(authenticate))
        .route("/upload", get(upload_form).post(upload_video))
        .route("/api/upload", post(api_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduces a client-supplied name to a safe single path component.
pub fn secure_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn page(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    let flashes: String = flashes
        .iter()
        .map(|f| format!("<div class=\"flash {}\">{}</div>\n", f.kind.css(), encode_text(&f.message)))
        .collect();
    Html(format!(
        "<!doctype html>
<html>
<head><meta charset=\"utf-8\"><title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 640px; margin: 2em auto; }}
.flash {{ padding: .6em 1em; margin-bottom: .5em; border-radius: 4px; }}
.success {{ background: #e3f6e3; }}
.error {{ background: #fbe3e3; }}
</style></head>
<body>
<h1>{title}</h1>
{flashes}{body}
</body>
</html>",
        title = encode_text(title)
    ))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    page(
        "Shorts Studio",
        &state.take_flashes(),
        "<ul>
<li><a href=\"/upload\">Upload a video</a></li>
<li><a href=\"/authenticate\">Re-authenticate with YouTube</a></li>
</ul>",
    )
}

async fn authenticate(State(state): State<AppState>) -> Redirect {
    match state.publisher.reauthenticate().await {
        Ok(()) => state.flash(FlashKind::Success, "Authentication successful!"),
        Err(err) => {
            logw(format!("Authentication failed: {err:#}"));
            state.flash(FlashKind::Error, format!("Authentication failed: {err}"));
        }
    }
    Redirect::to("/")
}

async fn upload_form(State(state): State<AppState>) -> Html<String> {
    page(
        "Upload Video",
        &state.take_flashes(),
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">
<p><label>Video <input type=\"file\" name=\"video\" accept=\"video/*\"></label></p>
<p><label>Title <input type=\"text\" name=\"title\"></label></p>
<p><label>Description <textarea name=\"description\"></textarea></label></p>
<p><button type=\"submit\">Upload (unlisted)</button></p>
</form>
<p><a href=\"/\">Back</a></p>",
    )
}

struct UploadForm {
    video: Option<(String, Bytes)>,
    title: Option<String>,
    description: Option<String>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm {
        video: None,
        title: None,
        description: None,
    };
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| e.to_string())?;
                form.video = Some((filename, data));
            }
            "title" => form.title = Some(field.text().await.map_err(|e| e.to_string())?),
            "description" => {
                form.description = Some(field.text().await.map_err(|e| e.to_string())?)
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn upload_video(State(state): State<AppState>, mut multipart: Multipart) -> Redirect {
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => {
            state.flash(FlashKind::Error, format!("Invalid upload: {err}"));
            return Redirect::to("/upload");
        }
    };

    let Some((filename, data)) = form.video else {
        state.flash(FlashKind::Error, "No video file part");
        return Redirect::to("/upload");
    };
    if filename.is_empty() {
        state.flash(FlashKind::Error, "No selected file");
        return Redirect::to("/upload");
    }
    if !allowed_file(&filename) {
        state.flash(FlashKind::Error, "File type not allowed");
        return Redirect::to("/upload");
    }

    let saved = state.upload_folder.join(secure_filename(&filename));
    if let Err(err) = save_upload(&saved, &data).await {
        state.flash(FlashKind::Error, format!("Could not save upload: {err}"));
        return Redirect::to("/upload");
    }
    logi(format!("Saved upload to {}", saved.display()));

    let meta = metadata_from(form.title, form.description);
    match state.publisher.publish(&saved, &meta).await {
        Ok(video) => {
            state.flash(
                FlashKind::Success,
                format!("Video uploaded successfully! URL: {}", video.video_url),
            );
            Redirect::to("/")
        }
        Err(err) => {
            logw(format!("Upload failed: {err:#}"));
            state.flash(FlashKind::Error, format!("Error uploading to YouTube: {err}"));
            Redirect::to("/upload")
        }
    }
}

async fn save_upload(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await
}

fn metadata_from(title: Option<String>, description: Option<String>) -> VideoMetadata {
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    VideoMetadata::new(title, description.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
struct ApiUploadRequest {
    file_path: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn api_upload(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ApiUploadRequest = serde_json::from_slice(&body).unwrap_or_default();
    let Some(file_path) = request.file_path.filter(|p| !p.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "Missing file path");
    };

    let path = PathBuf::from(&file_path);
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return json_error(StatusCode::NOT_FOUND, "File not found");
    }

    let meta = metadata_from(request.title, request.description);
    match state.publisher.publish(&path, &meta).await {
        Ok(video) => Json(json!({
            "success": true,
            "video_id": video.video_id,
            "video_url": video.video_url,
        }))
        .into_response(),
        Err(err) => {
            logw(format!("API upload failed: {err:#}"));
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

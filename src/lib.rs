pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod generator;
pub mod init;
pub mod narration;
pub mod oauth;
pub mod platform;
pub mod scrape;
pub mod script;
pub mod topics;
pub mod tts;
pub mod upload;
pub mod web;

pub use error::PipelineError;

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("{}", message),
        "OK" => tracing::info!(status = "ok", "{}", message),
        _ => tracing::info!("{}", message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}

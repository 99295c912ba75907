use thiserror::Error;

/// Typed failures surfaced by the pipeline stages. Everything else travels as
/// `anyhow::Error` with context attached at the call site.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} is not configured (set it in config.json or the environment)")]
    MissingApiKey(&'static str),

    #[error("{service} returned HTTP {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    #[error("no text to synthesize")]
    EmptyScript,

    #[error("client secrets not found at {0}")]
    MissingClientSecrets(String),

    #[error("oauth consent failed: {0}")]
    Consent(String),

    #[error("oauth token refresh rejected: {0}")]
    RefreshRejected(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("upload rejected: {0}")]
    Upload(String),
}

use crate::fetch::DownloadAttempt;

/// Core error type for the update monitor.
///
/// Adapter crates map their specific errors into this type so the engine can
/// tell apart fatal startup problems, exhausted fetches and best-effort
/// notification failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch of {url} failed after {} attempt(s): {cause}", attempts.len())]
    Fetch {
        url: String,
        attempts: Vec<DownloadAttempt>,
        cause: String,
    },

    #[error("notification error: {0}")]
    Notification(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors from a single backend HTTP operation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication rejected by backend (HTTP {0})")]
    AuthRejected(u16),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Credentials problems are logged louder than ordinary network faults.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, BackendError::AuthRejected(_))
    }
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

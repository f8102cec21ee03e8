use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Apify API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("actor run finished with status {0}")]
    RunFailed(String),

    #[error("actor run did not finish within {0} seconds")]
    Timeout(u64),

    #[error("no scraper actor is registered for platform {0}")]
    UnsupportedPlatform(String),
}

impl ApifyError {
    /// Whether retrying the same request later could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApifyError::Http(e) => e.is_timeout() || e.is_connect(),
            ApifyError::Api { status, .. } => *status == 429 || *status >= 500,
            ApifyError::Timeout(_) => true,
            ApifyError::RunFailed(_) | ApifyError::UnsupportedPlatform(_) => false,
        }
    }
}

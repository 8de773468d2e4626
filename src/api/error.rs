use std::time::Duration;
use thiserror::Error;

/// Failures talking to the catalogue, sorted by what a caller can do about them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 429. `retry_after` is the server's hint in seconds, if any.
    #[error("rate_limited: retry_after={retry_after:?}")]
    RateLimited { retry_after: Option<u64> },

    /// 5xx from the catalogue or token endpoint.
    #[error("tidal server error: {status} => {body}")]
    Server { status: u16, body: String },

    /// A 4xx other than 401/404/429, e.g. a region-restricted track.
    #[error("tidal rejected the request: {status} => {body}")]
    Rejected { status: u16, body: String },

    /// No usable token: corrupted or missing session, refused refresh,
    /// or a 401 that survived a token renewal.
    #[error("tidal authentication failed: {0}")]
    Auth(String),

    #[error("tidal transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Build the error for a non-success status that is not handled inline.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error() {
            ApiError::Server {
                status: status.as_u16(),
                body,
            }
        } else {
            ApiError::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }

    /// Whether the same request can succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. } | ApiError::Server { .. } | ApiError::Transport(_)
        )
    }

    /// Whether every following request is bound to fail the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Minimum pause before the next attempt. One second on top of the
    /// server's hint; two when it gave none.
    pub fn min_backoff(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => {
                Some(Duration::from_secs(retry_after.unwrap_or(2) + 1))
            }
            _ => None,
        }
    }
}

/// The `ApiError` inside an `anyhow::Error`, if that is what it carries.
pub fn api_error(e: &anyhow::Error) -> Option<&ApiError> {
    e.downcast_ref::<ApiError>()
}

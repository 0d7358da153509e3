use thiserror::Error;

/// Errors that can occur while talking to the rules API.
///
/// SECURITY: Error messages must NEVER contain the API key.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed (invalid, expired or under-privileged key)
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level error (connection failed, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("rules group not found: '{id}'")]
    NotFound { id: String },

    /// Response body did not match the expected wire format
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ApiError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } => true,
            ApiError::Api { status, .. } => *status >= 500,
            ApiError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

//! HTTP error types

/// Error type for HTTP operations.
///
/// None of these reach a script: the call proxy collapses every error into
/// a `null` return.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(String),

    #[error("No mock response registered for {0}")]
    NoMockResponse(String),
}

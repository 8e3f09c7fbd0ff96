//! AirLabs client error types.

use std::sync::Arc;

use flightcache_core::Error;

/// Errors from the AirLabs schedules API client.
#[derive(Debug, thiserror::Error)]
pub enum AirLabsError {
    /// Missing FLIGHTCACHE_AIRLABS_API_KEY.
    #[error("missing API key: FLIGHTCACHE_AIRLABS_API_KEY not set")]
    MissingApiKey,

    /// Location code is not 3-4 letters or digits.
    #[error("invalid location code: {0}")]
    InvalidCode(String),

    /// Invalid base URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by AirLabs.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Error object returned in the response body.
    #[error("provider error {code}: {message}")]
    Api { code: String, message: String },
}

/// Request URLs carry the API key, so it is stripped before wrapping.
impl From<reqwest::Error> for AirLabsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { AirLabsError::Timeout } else { AirLabsError::Network(Arc::new(err.without_url())) }
    }
}

impl From<AirLabsError> for Error {
    fn from(err: AirLabsError) -> Self {
        let message = err.to_string();
        match err {
            AirLabsError::InvalidCode(_) => Error::InvalidInput(message),
            AirLabsError::Timeout => Error::FetchTimeout(message),
            AirLabsError::Parse(_) => Error::OriginMalformed(message),
            AirLabsError::MissingApiKey
            | AirLabsError::InvalidBaseUrl(_)
            | AirLabsError::AuthError
            | AirLabsError::RateLimited
            | AirLabsError::HttpError { .. }
            | AirLabsError::Network(_)
            | AirLabsError::Api { .. } => Error::OriginUnavailable(message),
        }
    }
}

//! Unified error types for flightcache.
//!
//! The display string of every variant starts with a stable code so callers
//! (and the MCP surface) can match on failure classes without parsing prose.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the flight cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a malformed location code).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Schedule provider unreachable or answered with a non-success status.
    #[error("ORIGIN_UNAVAILABLE: {0}")]
    OriginUnavailable(String),

    /// Schedule provider payload did not have the expected shape.
    #[error("ORIGIN_MALFORMED: {0}")]
    OriginMalformed(String),

    /// Origin fetch did not complete within the configured timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Backing store read or write failed.
    #[error("STORE_FAILURE: {0}")]
    StoreFailure(String),

    /// SQLite operation failed.
    #[error("STORE_FAILURE: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_FAILURE: migration failed: {0}")]
    MigrationFailed(String),

    /// A record collided with an existing row on its unique identity.
    #[error("DUPLICATE_RECORD: {0}")]
    DuplicateRecordConflict(String),
}

impl Error {
    /// Whether this error came from the schedule provider rather than local state.
    pub fn is_origin_failure(&self) -> bool {
        matches!(self, Error::OriginUnavailable(_) | Error::OriginMalformed(_) | Error::FetchTimeout(_))
    }

    /// Whether this error came from the backing store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::StoreFailure(_) | Error::Database(_) | Error::MigrationFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StoreFailure(format!("cache entry encoding: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::OriginUnavailable(msg) => (-32001, msg.clone()),
            Error::OriginMalformed(msg) => (-32003, msg.clone()),
            Error::FetchTimeout(msg) => (-32004, msg.clone()),
            Error::DuplicateRecordConflict(msg) => (-32005, msg.clone()),
            Error::StoreFailure(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

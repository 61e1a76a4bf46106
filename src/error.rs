// src/error.rs
use serde::Serialize;

use crate::data::Resource;

/// Why a table produced no records.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("table text is empty")]
    Empty,
    #[error("no valid ranking rows among {rows} rows (site layout changed?)")]
    NoRecords { rows: usize },
    #[error("records do not form one snapshot: {0}")]
    Inconsistent(String),
}

/// Errors attached to a response. Every variant is recoverable for the service.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not ready yet")]
    NotReady(Resource),
    #[error("a country key is required")]
    MissingKey,
    #[error("no entry for '{0}'")]
    NoEntry(String),
    #[error("request carried no payload")]
    MissingPayload,
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("could not persist {resource}: {message}")]
    Write { resource: Resource, message: String },
    #[error("fetch of {resource} failed: {message}")]
    FetchFailed { resource: Resource, message: String },
    #[error("result for {resource} belongs to a superseded fetch")]
    StaleResult { resource: Resource },
    #[error("operation '{0}' not supported")]
    Unsupported(String),
}

impl ServiceError {
    /// Stable transport-neutral code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotReady(_) => "NOT_READY",
            ServiceError::MissingKey => "MISSING_KEY",
            ServiceError::NoEntry(_) => "NO_ENTRY",
            ServiceError::MissingPayload => "MISSING_PAYLOAD",
            ServiceError::Parse(_) => "PARSE_ERROR",
            ServiceError::Write { .. } => "WRITE_ERROR",
            ServiceError::FetchFailed { .. } => "FETCH_FAILED",
            ServiceError::StaleResult { .. } => "STALE_RESULT",
            ServiceError::Unsupported(_) => "UNSUPPORTED_OPERATION",
        }
    }

    /// Worth asking again later without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::NotReady(_) | ServiceError::FetchFailed { .. })
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload { code: self.code(), message: self.to_string(), retryable: self.is_retryable() }
    }
}

/// Error side of a serialized `Response`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },
    #[error("snapshot {path} is corrupt: {reason}")]
    Corrupt { path: std::path::PathBuf, reason: String },
}

impl StoreError {
    pub fn into_service(self, resource: Resource) -> ServiceError {
        ServiceError::Write { resource, message: self.to_string() }
    }
}

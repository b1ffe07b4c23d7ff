//! Error taxonomy for the trend engine.
//!
//! `FetchError` and `ExtractionError` never leave the resilience layer; they are
//! absorbed into fallback data. `ValidationError` is the only kind that reaches
//! HTTP callers.

use std::time::Duration;

use crate::model::SourceId;

/// Failure of one adapter invocation, tagged with the source it came from.
#[derive(Debug, thiserror::Error)]
#[error("{source_id}: {cause}")]
pub struct FetchError {
    pub source_id: SourceId,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(source_id: SourceId, cause: impl Into<FetchCause>) -> Self {
        Self {
            source_id,
            cause: cause.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, FetchCause::Timeout(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchCause {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("browser session error: {0}")]
    Browser(String),
    #[error("strategy unavailable: {0}")]
    Unavailable(&'static str),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl From<reqwest::Error> for FetchCause {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchCause::Status(status.as_u16());
        }
        FetchCause::Network(e.to_string())
    }
}

/// Zero or unusable items after parsing a fetched document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no items extracted")]
    Empty,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Bad input at the query boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown source `{0}`")]
    UnknownSource(String),
}

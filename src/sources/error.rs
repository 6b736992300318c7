use std::time::Duration;

use thiserror::Error;

/// Why a single adapter call produced no fixtures.
///
/// Adapters return these instead of panicking or fabricating data; the chain
/// logs them and moves on to the next source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned HTTP {0}")]
    Http(u16),

    #[error("unparseable response: {0}")]
    Parse(String),

    #[error("malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Http(_) => "http",
            FetchError::Parse(_) => "parse",
            FetchError::MalformedRecord { .. } => "malformed_record",
            FetchError::Request(_) => "request",
        }
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        FetchError::MalformedRecord {
            index,
            reason: reason.into(),
        }
    }

    /// Classify a transport error. `budget` is the timeout the client was
    /// built with, since reqwest does not report it.
    pub(crate) fn from_reqwest(e: reqwest::Error, budget: Duration) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(budget)
        } else if let Some(status) = e.status() {
            FetchError::Http(status.as_u16())
        } else if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

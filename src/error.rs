//! Error taxonomy for ingestion, archive expansion and the remote boundary.
//!
//! Archive-level errors abort a single expand operation; remote errors are
//! folded into a failed result row and never abort a batch.

use thiserror::Error;

use crate::models::ErrorCategory;

/// A candidate that was filtered out before reaching the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("unsupported file format: {name}")]
    UnsupportedFormat { name: String },
}

/// Structural failure of a whole archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive is {size} bytes, which exceeds the {max} byte limit")]
    SizeExceeded { size: u64, max: u64 },

    #[error("input is not a ZIP archive")]
    InvalidFormat,

    #[error("archive is corrupt: {0}")]
    Corrupt(String),

    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to materialize a single archive member. Recorded as a skip.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemberError {
    #[error("entry is empty")]
    Empty,

    #[error("entry exceeds {0} bytes")]
    TooLarge(u64),

    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// Failure of one remote analysis request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never completed (connect, timeout, transport).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The service answered with a non-success status.
    #[error("{detail}")]
    AnalysisRejected { status: u16, detail: String },

    /// The service answered 2xx but the body was not a JSON object.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RemoteError::AnalysisRejected { .. } => ErrorCategory::Server,
            RemoteError::RequestFailed(_) | RemoteError::InvalidResponse(_) => {
                ErrorCategory::Client
            }
        }
    }

    /// Message stored on the failed result row.
    pub fn row_message(&self) -> String {
        match self {
            RemoteError::AnalysisRejected { detail, .. } if !detail.trim().is_empty() => {
                detail.clone()
            }
            RemoteError::AnalysisRejected { status, .. } => {
                format!("Analysis failed (HTTP {})", status)
            }
            RemoteError::RequestFailed(msg) => format!("Network error: {}", msg),
            RemoteError::InvalidResponse(msg) => format!("Invalid response: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_maps_to_server_category() {
        let err = RemoteError::AnalysisRejected {
            status: 422,
            detail: "No relevant codes found".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Server);
        assert_eq!(err.row_message(), "No relevant codes found");
    }

    #[test]
    fn rejected_without_detail_gets_generic_message() {
        let err = RemoteError::AnalysisRejected {
            status: 500,
            detail: "  ".to_string(),
        };
        assert_eq!(err.row_message(), "Analysis failed (HTTP 500)");
    }

    #[test]
    fn transport_failure_is_client_side() {
        let err = RemoteError::RequestFailed("connection refused".to_string());
        assert_eq!(err.category(), ErrorCategory::Client);
        assert!(err.row_message().starts_with("Network error"));
    }
}

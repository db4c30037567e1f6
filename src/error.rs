//! Error types for fuzz-stats
//!
//! Per-record problems (`MalformedInput`, `InconsistentUniverse`) are collected
//! as rejections and never abort a batch. `EmptyInput` is fatal only when a
//! whole batch has nothing to reduce; per-group absence is modelled with
//! [`Outcome::NoData`](crate::Outcome::NoData) instead.

use serde::Serialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// fuzz-stats error types
#[derive(Error, Debug)]
pub enum Error {
    /// A record violates the input contract (both selectors set, missing field, ...)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Nothing to reduce (no sessions, zero sets to intersect, empty matrix)
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A session's derived total pair count disagrees with the batch value
    #[error("Inconsistent parser universe in {session}: expected {expected} total pairs, found {found}")]
    InconsistentUniverse {
        /// Pair count the batch was derived with
        expected: usize,
        /// Pair count derived from the offending session
        found: usize,
        /// Label of the offending session
        session: String,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage error (Parquet/Arrow export)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error only disqualifies a single record.
    ///
    /// Record-local errors are reported and skipped; everything else ends the run.
    #[must_use]
    pub const fn is_record_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput(_)
                | Self::InconsistentUniverse { .. }
                | Self::Json(_)
                | Self::Io(_)
        )
    }
}

/// Why a record was left out of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The record could not be read or decoded.
    Unreadable,
    /// The record violates the input contract.
    Malformed,
    /// The record disagrees with the batch's total pair count.
    InconsistentUniverse,
}

/// A record that was reported and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Label of the rejected record (file path or session label).
    pub source: String,
    /// Rejection category.
    pub kind: RejectionKind,
    /// Human-readable reason.
    pub reason: String,
}

impl Rejection {
    /// Build a rejection from the error that disqualified the record.
    #[must_use]
    pub fn from_error(source: impl Into<String>, error: &Error) -> Self {
        let kind = match error {
            Error::InconsistentUniverse { .. } => RejectionKind::InconsistentUniverse,
            Error::Io(_) | Error::Json(_) => RejectionKind::Unreadable,
            _ => RejectionKind::Malformed,
        };
        Self {
            source: source.into(),
            kind,
            reason: error.to_string(),
        }
    }
}

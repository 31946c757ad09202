//! Error types for the reporting engine.
//!
//! The taxonomy separates fatal, report-aborting failures (`ReportError`)
//! from recoverable ones: storage faults that drop a single beneficiary,
//! and per-answer faults that drop a beneficiary from a single target.
//! Everything recoverable is converted to warning text by the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to coerce an answer value into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// The answer holds a non-numeric value (text, boolean, ...).
    #[error("cannot convert {kind} answer to a number")]
    NonNumericAnswer {
        /// Human-readable name of the offending value kind.
        kind: &'static str,
    },
}

/// Failure while computing a per-meeting category aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// An answer belonging to the category could not be coerced.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The requested category is not part of the outcome set.
    #[error("couldn't find category {0}")]
    UnknownCategory(String),
}

/// Failure raised by a meeting store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Document kind, e.g. "outcome set".
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A document could not be read from disk.
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document was read but could not be parsed.
    #[error("failed to parse {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The backing store reported an error of its own.
    #[allow(dead_code)] // Constructed by non-filesystem store backends
    #[error("{0}")]
    Backend(String),
}

/// Fatal, report-aborting failures.
///
/// Callers receive either a complete report or exactly one of these;
/// never a partially populated report alongside an error.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The outcome set could not be fetched.
    #[error("failed to load outcome set {outcome_set_id}")]
    OutcomeSet {
        outcome_set_id: String,
        #[source]
        source: StoreError,
    },

    /// The in-range meetings could not be fetched.
    #[error("failed to load meetings for outcome set {outcome_set_id}")]
    MeetingsInRange {
        outcome_set_id: String,
        #[source]
        source: StoreError,
    },

    /// No meetings exist for the outcome set within the requested window.
    #[error("no meetings found for the outcome set within the given date range")]
    NoMeetingsInRange,

    /// The caller-supplied timeout expired before the report completed.
    #[error("report generation was cancelled before completing")]
    Cancelled,
}

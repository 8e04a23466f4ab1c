//! Error types for the trajectory pipeline.
//!
//! All fallible operations return `TrajectoryResult<T>`. Row-, visit- and
//! element-level variants are logged and skipped by the ingestion pipeline;
//! `ReferenceData`, `ConfigError` and `StoreUnavailable` abort a run.

use thiserror::Error;

/// The unified error type for the trajectory workspace.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    /// A patient row could not be split into columns or its serialized
    /// visit list is malformed. The row is skipped.
    #[error("record parse error at line {line}: {reason}")]
    RecordParse { line: u64, reason: String },

    /// A visit's age-code could not be decoded. The visit is skipped.
    #[error("cannot decode age code '{age_code}': {reason}")]
    AgeDecode { age_code: String, reason: String },

    /// A diagnosis code is absent from the code dictionary.
    #[error("diagnosis code '{code}' is not in the code dictionary")]
    UnknownDiagnosisCode { code: String },

    /// A single upsert or query against the graph store failed.
    #[error("store write failed for {element}: {reason}")]
    StoreWrite { element: String, reason: String },

    /// The graph store cannot be reached at all.
    #[error("graph store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A store operation did not complete within its time budget.
    #[error("store operation '{operation}' timed out after {timeout_ms} ms")]
    StoreTimeout { operation: String, timeout_ms: u64 },

    /// The reference table is missing required columns or is unreadable.
    ///
    /// Fatal: every node name depends on it, so nothing is written.
    #[error("malformed reference data: {reason}")]
    ReferenceData { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A file could not be opened or read.
    #[error("i/o error on '{path}': {reason}")]
    Io { path: String, reason: String },
}

impl TrajectoryError {
    /// True for transient store failures that a bounded retry may recover.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrajectoryError::StoreUnavailable { .. } | TrajectoryError::StoreTimeout { .. }
        )
    }
}

/// Convenience alias used throughout the trajectory crates.
pub type TrajectoryResult<T> = Result<T, TrajectoryError>;

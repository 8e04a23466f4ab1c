//! Ingestion run identity and summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::IngestionMode;

/// Unique identifier of one ingestion run. Appears in every log line the run emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Counters gathered while parsing input rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTally {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub visits_skipped: u64,
    pub codes_dropped: u64,
}

impl ParseTally {
    /// Fold another tally into this one. Used when patients are sharded.
    pub fn absorb(&mut self, other: &ParseTally) {
        self.rows_read += other.rows_read;
        self.rows_skipped += other.rows_skipped;
        self.visits_skipped += other.visits_skipped;
        self.codes_dropped += other.codes_dropped;
    }
}

/// The summary of one completed ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub run_id: RunId,
    pub mode: IngestionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub parse: ParseTally,
    /// Transition tuples extracted (rebuild mode only).
    pub transitions: u64,
    pub nodes_written: u64,
    pub edges_written: u64,
    /// Elements that failed to write and were skipped.
    pub write_failures: u64,
}

//! Ingestion policy enums.
//!
//! Expressed as kebab-case strings in TOML:
//! ```toml
//! mode = "rebuild"            # or "merge-visits"
//! unknown_codes = "drop"      # or "label-unknown"
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which graph shape an ingestion run writes, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestionMode {
    /// Clear the store, then write diagnosis nodes and `PROGRESSES_TO`
    /// edges with freshly computed statistics.
    #[default]
    Rebuild,
    /// Merge `Patient` and `Diagnosis` nodes and one `HAS_DIAGNOSIS` edge
    /// per visit, preserving whatever is already in the store.
    MergeVisits,
}

impl fmt::Display for IngestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionMode::Rebuild => f.write_str("rebuild"),
            IngestionMode::MergeVisits => f.write_str("merge-visits"),
        }
    }
}

/// What to do with a diagnosis code that the dictionary does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownCodePolicy {
    /// Remove the code from the patient's events.
    #[default]
    Drop,
    /// Keep the code; its node is named with the configured unknown label.
    LabelUnknown,
}

//! Transition tuples and progression-edge statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnosis::{DiagnosisCode, Stratum};

/// One consecutive pair in a patient's sorted history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTuple {
    pub from: DiagnosisCode,
    pub to: DiagnosisCode,
    /// Years between the two diagnoses. Zero for same-age pairs.
    pub interval: u32,
    pub stratum: Stratum,
}

/// Descriptive statistics over a multiset of intervals, in years.
///
/// Optional fields are absent rather than zero when the sample is too small
/// to define them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub count: u64,
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation. Absent when `count < 2`.
    pub std_dev: Option<f64>,
    /// First quartile. Absent when `count < 4`.
    pub q1: Option<f64>,
    /// Third quartile. Absent when `count < 4`.
    pub q3: Option<f64>,
}

/// Statistics for one stratum of an edge, with the raw intervals kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumStats {
    pub stats: IntervalStats,
    /// Sorted ascending.
    pub intervals: Vec<u32>,
}

/// A directed `from → to` progression with overall and per-stratum statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEdge {
    pub from: DiagnosisCode,
    pub to: DiagnosisCode,
    /// Computed over the union of every stratum's intervals.
    pub overall: IntervalStats,
    pub strata: BTreeMap<Stratum, StratumStats>,
}

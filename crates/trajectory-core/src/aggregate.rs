//! Aggregation engine: transition tuples → per-edge statistics.
//!
//! The accumulator keeps every raw interval per `(from, to)` pair and
//! stratum, because medians, quartiles and deviations need the full
//! distribution. Accumulators built over disjoint patient shards can be
//! merged in any order; `finish` sorts before computing, so the resulting
//! edges are identical however the input was split or ordered.

use std::collections::BTreeMap;

use trajectory_contracts::{
    diagnosis::{DiagnosisCode, Stratum},
    trajectory::{ProgressionEdge, StratumStats, TransitionTuple},
};

use crate::stats;

type Pair = (DiagnosisCode, DiagnosisCode);

/// Transient per-run accumulation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionAccumulator {
    pairs: BTreeMap<Pair, BTreeMap<Stratum, Vec<u32>>>,
    tuples: u64,
}

impl TransitionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tuple: TransitionTuple) {
        self.pairs
            .entry((tuple.from, tuple.to))
            .or_default()
            .entry(tuple.stratum)
            .or_default()
            .push(tuple.interval);
        self.tuples += 1;
    }

    pub fn record_all<I: IntoIterator<Item = TransitionTuple>>(&mut self, tuples: I) {
        for tuple in tuples {
            self.record(tuple);
        }
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: TransitionAccumulator) {
        for (pair, strata) in other.pairs {
            let target = self.pairs.entry(pair).or_default();
            for (stratum, mut intervals) in strata {
                target.entry(stratum).or_default().append(&mut intervals);
            }
        }
        self.tuples += other.tuples;
    }

    /// Number of distinct ordered pairs observed.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Number of tuples recorded, across all pairs.
    pub fn tuple_count(&self) -> u64 {
        self.tuples
    }

    /// Every code appearing on either side of an observed pair.
    pub fn codes(&self) -> impl Iterator<Item = &DiagnosisCode> {
        self.pairs.keys().flat_map(|(from, to)| [from, to])
    }

    /// Compute statistics for every pair, ordered by `(from, to)`.
    ///
    /// `overall` is computed directly over the union of all strata.
    pub fn finish(self) -> Vec<ProgressionEdge> {
        self.pairs
            .into_iter()
            .filter_map(|((from, to), strata)| {
                let mut all: Vec<u32> = Vec::new();
                let mut per_stratum = BTreeMap::new();

                for (stratum, mut intervals) in strata {
                    intervals.sort_unstable();
                    all.extend_from_slice(&intervals);
                    if let Some(stats) = stats::compute_sorted(&intervals) {
                        per_stratum.insert(stratum, StratumStats { stats, intervals });
                    }
                }

                all.sort_unstable();
                let overall = stats::compute_sorted(&all)?;
                Some(ProgressionEdge {
                    from,
                    to,
                    overall,
                    strata: per_stratum,
                })
            })
            .collect()
    }
}

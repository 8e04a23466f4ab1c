//! Batched writes with per-element fallback.
//!
//! Records are sent in chunks of `batch_size`. When a chunk is rejected the
//! writer resends its elements one at a time so a single bad record costs
//! only itself: it is logged and skipped, the rest are written.
//!
//! Retryable failures (`StoreUnavailable`, `StoreTimeout`) mean the store
//! itself is gone, not that a record is bad, so they end the run.

use tracing::{debug, warn};

use trajectory_contracts::{
    error::TrajectoryResult,
    graph::{EdgeRecord, NodeRecord},
    report::RunId,
};
use trajectory_core::traits::GraphStore;

/// Outcome of one write phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteTally {
    pub written: u64,
    pub failed: u64,
}

pub struct BatchWriter<'a> {
    store: &'a dyn GraphStore,
    batch_size: usize,
    run_id: &'a RunId,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn GraphStore, batch_size: usize, run_id: &'a RunId) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            run_id,
        }
    }

    pub fn write_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<WriteTally> {
        self.write("node", nodes, |batch| self.store.upsert_nodes(batch))
    }

    pub fn write_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<WriteTally> {
        self.write("edge", edges, |batch| self.store.upsert_edges(batch))
    }

    fn write<T>(
        &self,
        kind: &str,
        records: &[T],
        upsert: impl Fn(&[T]) -> TrajectoryResult<()>,
    ) -> TrajectoryResult<WriteTally> {
        let mut tally = WriteTally::default();

        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            match upsert(batch) {
                Ok(()) => {
                    tally.written += batch.len() as u64;
                    debug!(run_id = %self.run_id, kind, batch = index, size = batch.len(), "batch written");
                }
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        run_id = %self.run_id,
                        kind,
                        batch = index,
                        size = batch.len(),
                        error = %e,
                        "batch rejected, writing elements one by one"
                    );
                    for record in batch {
                        match upsert(std::slice::from_ref(record)) {
                            Ok(()) => tally.written += 1,
                            Err(e) if e.is_retryable() => return Err(e),
                            Err(e) => {
                                warn!(run_id = %self.run_id, kind, error = %e, "skipping record that failed to write");
                                tally.failed += 1;
                            }
                        }
                    }
                }
            }
        }

        Ok(tally)
    }
}

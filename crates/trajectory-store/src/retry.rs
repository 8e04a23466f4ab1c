//! Bounded retry around any `GraphStore`.
//!
//! Only errors for which `TrajectoryError::is_retryable` holds
//! (`StoreUnavailable`, `StoreTimeout`) are retried. The delay grows
//! linearly: `backoff`, `2 * backoff`, ...

use std::{thread, time::Duration};

use tracing::warn;

use trajectory_contracts::{
    error::TrajectoryResult,
    graph::{EdgeRecord, GraphQuery, NodeRecord, Row},
};
use trajectory_core::traits::GraphStore;

pub struct RetryingStore<S> {
    inner: S,
    max_retries: u32,
    backoff: Duration,
}

impl<S: GraphStore> RetryingStore<S> {
    pub fn new(inner: S, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn with_retry<T>(&self, operation: &str, mut call: impl FnMut() -> TrajectoryResult<T>) -> TrajectoryResult<T> {
        let mut attempt = 0;
        loop {
            match call() {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "store call failed, retrying"
                    );
                    thread::sleep(self.backoff * attempt);
                }
                result => return result,
            }
        }
    }
}

impl<S: GraphStore> GraphStore for RetryingStore<S> {
    fn clear(&self) -> TrajectoryResult<()> {
        self.with_retry("clear", || self.inner.clear())
    }

    fn ensure_unique(&self, label: &str, field: &str) -> TrajectoryResult<()> {
        self.with_retry("ensure_unique", || self.inner.ensure_unique(label, field))
    }

    fn upsert_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<()> {
        self.with_retry("upsert_nodes", || self.inner.upsert_nodes(nodes))
    }

    fn upsert_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<()> {
        self.with_retry("upsert_edges", || self.inner.upsert_edges(edges))
    }

    fn query(&self, query: &GraphQuery) -> TrajectoryResult<Vec<Row>> {
        self.with_retry("query", || self.inner.query(query))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use trajectory_contracts::error::TrajectoryError;

    use super::*;

    /// Fails the first `failures` calls with `error`, then succeeds.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
        error: TrajectoryError,
    }

    impl FlakyStore {
        fn new(failures: u32, error: TrajectoryError) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error,
            }
        }

        fn call(&self) -> TrajectoryResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    impl GraphStore for FlakyStore {
        fn clear(&self) -> TrajectoryResult<()> {
            self.call()
        }
        fn ensure_unique(&self, _: &str, _: &str) -> TrajectoryResult<()> {
            self.call()
        }
        fn upsert_nodes(&self, _: &[NodeRecord]) -> TrajectoryResult<()> {
            self.call()
        }
        fn upsert_edges(&self, _: &[EdgeRecord]) -> TrajectoryResult<()> {
            self.call()
        }
        fn query(&self, _: &GraphQuery) -> TrajectoryResult<Vec<Row>> {
            self.call().map(|_| Vec::new())
        }
    }

    fn unavailable() -> TrajectoryError {
        TrajectoryError::StoreUnavailable {
            reason: "connection refused".to_string(),
        }
    }

    #[test]
    fn transient_failures_are_retried() {
        let store = RetryingStore::new(FlakyStore::new(2, unavailable()), 3, Duration::ZERO);
        assert!(store.upsert_nodes(&[]).is_ok());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retries_are_bounded() {
        let store = RetryingStore::new(FlakyStore::new(10, unavailable()), 2, Duration::ZERO);
        assert!(matches!(store.clear(), Err(TrajectoryError::StoreUnavailable { .. })));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn write_errors_are_not_retried() {
        let error = TrajectoryError::StoreWrite {
            element: "(A)-[PROGRESSES_TO]->(B)".to_string(),
            reason: "constraint violation".to_string(),
        };
        let store = RetryingStore::new(FlakyStore::new(1, error), 3, Duration::ZERO);
        assert!(matches!(store.upsert_edges(&[]), Err(TrajectoryError::StoreWrite { .. })));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeouts_are_retried() {
        let error = TrajectoryError::StoreTimeout {
            operation: "query".to_string(),
            timeout_ms: 10,
        };
        let store = RetryingStore::new(FlakyStore::new(1, error), 1, Duration::ZERO);
        assert!(store
            .query(&GraphQuery::FetchNode {
                key: trajectory_contracts::graph::NodeKey::diagnosis("A"),
            })
            .is_ok());
    }
}

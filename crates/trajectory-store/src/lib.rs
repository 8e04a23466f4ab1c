//! # trajectory-store
//!
//! `GraphStore` backends.
//!
//! - `InMemoryGraphStore`: ordered in-process graph with JSON snapshots and a
//!   SHA-256 fingerprint, used by the tests and for local runs
//! - `RetryingStore`: bounded retry of transient failures around any store
//! - `Neo4jGraphStore` (feature `neo4j`): Cypher over Bolt
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trajectory_store::{InMemoryGraphStore, RetryingStore};
//!
//! let store = RetryingStore::new(InMemoryGraphStore::open(&snapshot)?, 3, Duration::from_millis(200));
//! ```

pub mod memory;
#[cfg(feature = "neo4j")]
pub mod neo4j;
pub mod retry;

pub use memory::{GraphSnapshot, InMemoryGraphStore};
#[cfg(feature = "neo4j")]
pub use neo4j::{Neo4jGraphStore, Neo4jSettings};
pub use retry::RetryingStore;

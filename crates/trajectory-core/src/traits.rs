//! Trait seams to the collaborators the trajectory pipeline does not own.
//!
//! - `GraphStore`      — the property-graph database (write and read side)
//! - `IntentExtractor` — question text → diagnosis mention and timeframe
//! - `Narrator`        — retrieved rows → prose (typically a language model)
//!
//! Components receive these as explicit handles. Nothing in the workspace
//! holds a global connection.

use std::sync::Arc;

use trajectory_contracts::{
    error::TrajectoryResult,
    graph::{EdgeRecord, GraphQuery, NodeRecord, Row},
    query::{Intent, PromptContext},
};

/// A property-graph store with merge-by-key write semantics.
///
/// Batched writes are all-or-nothing from the caller's point of view: on
/// `Err`, the caller may retry the batch element by element to isolate the
/// failing record.
pub trait GraphStore: Send + Sync {
    /// Remove every node and edge.
    fn clear(&self) -> TrajectoryResult<()>;

    /// Declare `field` as a unique key for nodes labelled `label`.
    ///
    /// Must be idempotent. Called before bulk writes so merges stay correct.
    fn ensure_unique(&self, label: &str, field: &str) -> TrajectoryResult<()>;

    /// Merge each node by key and set its properties.
    fn upsert_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<()>;

    /// Merge each edge by `(label, from, to, discriminator)` and set its
    /// properties. Missing endpoint nodes are merged by key first.
    fn upsert_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<()>;

    /// Execute a read statement.
    fn query(&self, query: &GraphQuery) -> TrajectoryResult<Vec<Row>>;
}

impl<S: GraphStore + ?Sized> GraphStore for Arc<S> {
    fn clear(&self) -> TrajectoryResult<()> {
        (**self).clear()
    }

    fn ensure_unique(&self, label: &str, field: &str) -> TrajectoryResult<()> {
        (**self).ensure_unique(label, field)
    }

    fn upsert_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<()> {
        (**self).upsert_nodes(nodes)
    }

    fn upsert_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<()> {
        (**self).upsert_edges(edges)
    }

    fn query(&self, query: &GraphQuery) -> TrajectoryResult<Vec<Row>> {
        (**self).query(query)
    }
}

/// Extracts what a free-text question is about.
///
/// Kept narrow so a keyword heuristic can be swapped for a model-backed
/// extractor without touching retrieval.
pub trait IntentExtractor: Send + Sync {
    fn extract(&self, question: &str) -> Intent;
}

/// Turns retrieved complications into a user-facing response.
pub trait Narrator: Send + Sync {
    fn narrate(&self, context: &PromptContext) -> TrajectoryResult<String>;
}

//! In-memory implementation of `GraphStore`.
//!
//! `InMemoryGraphStore` is the reference implementation of the `GraphStore`
//! trait. Nodes and edges live in ordered maps behind a `Mutex`, so reads
//! are deterministic and the store can be shared across threads.
//!
//! The whole graph can be written to and read back from a JSON snapshot,
//! which lets separate command invocations work on the same graph, and
//! hashed with `fingerprint()` to compare two builds.

use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use trajectory_contracts::{
    error::{TrajectoryError, TrajectoryResult},
    graph::{Discriminator, EdgeRecord, GraphQuery, NodeKey, NodeRecord, Properties, PropertyValue, Row},
};
use trajectory_core::traits::GraphStore;

// ── Internal state ────────────────────────────────────────────────────────────

/// Identity of an edge under merge semantics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeKey {
    label: String,
    from: NodeKey,
    to: NodeKey,
    discriminator: Option<Discriminator>,
}

impl EdgeKey {
    fn of(edge: &EdgeRecord) -> Self {
        Self {
            label: edge.label.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            discriminator: edge.discriminator.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeKey, Properties>,
    edges: BTreeMap<EdgeKey, Properties>,
    /// `label → field` declared unique.
    constraints: BTreeMap<String, String>,
}

impl GraphState {
    fn check_node_key(&self, key: &NodeKey, element: impl Fn() -> String) -> TrajectoryResult<()> {
        if key.value.is_empty() {
            return Err(TrajectoryError::StoreWrite {
                element: element(),
                reason: "empty merge key".to_string(),
            });
        }
        match self.constraints.get(&key.label) {
            Some(field) if *field != key.field => Err(TrajectoryError::StoreWrite {
                element: element(),
                reason: format!(
                    "{} nodes are unique on '{}', not '{}'",
                    key.label, field, key.field
                ),
            }),
            _ => Ok(()),
        }
    }

    /// Merge a node by key: create it if missing, then set `properties`.
    fn merge_node(&mut self, key: &NodeKey, properties: &Properties) {
        let node = self.nodes.entry(key.clone()).or_insert_with(|| {
            let mut props = Properties::new();
            props.insert(key.field.clone(), PropertyValue::Text(key.value.clone()));
            props
        });
        set_properties(node, properties);
    }

    fn merge_edge(&mut self, edge: &EdgeRecord) {
        self.merge_node(&edge.from, &Properties::new());
        self.merge_node(&edge.to, &Properties::new());
        let props = self.edges.entry(EdgeKey::of(edge)).or_insert_with(|| {
            let mut props = Properties::new();
            if let Some(d) = &edge.discriminator {
                props.insert(d.field.clone(), PropertyValue::Text(d.value.clone()));
            }
            props
        });
        set_properties(props, &edge.properties);
    }

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            constraints: self.constraints.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|(key, properties)| NodeRecord {
                    key: key.clone(),
                    properties: properties.clone(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|(key, properties)| EdgeRecord {
                    label: key.label.clone(),
                    from: key.from.clone(),
                    to: key.to.clone(),
                    discriminator: key.discriminator.clone(),
                    properties: properties.clone(),
                })
                .collect(),
        }
    }

    fn restore(snapshot: GraphSnapshot) -> Self {
        let mut state = GraphState {
            constraints: snapshot.constraints,
            ..GraphState::default()
        };
        for node in snapshot.nodes {
            state.nodes.insert(node.key, node.properties);
        }
        for edge in snapshot.edges {
            let key = EdgeKey::of(&edge);
            state.edges.insert(key, edge.properties);
        }
        state
    }

    fn search(&self, label: &str, fields: &[String], needle: &str, limit: usize) -> Vec<Row> {
        let needle = needle.to_lowercase();
        let mut hits: Vec<(String, &NodeKey, &Properties)> = self
            .nodes
            .iter()
            .filter(|(key, _)| key.label == label)
            .filter(|(_, props)| {
                fields.iter().any(|f| {
                    props
                        .get(f)
                        .and_then(PropertyValue::as_str)
                        .is_some_and(|v| v.to_lowercase().contains(&needle))
                })
            })
            .map(|(key, props)| {
                let order = fields
                    .first()
                    .and_then(|f| props.get(f))
                    .and_then(PropertyValue::as_str)
                    .unwrap_or_default()
                    .to_string();
                (order, key, props)
            })
            .collect();
        hits.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        hits.into_iter()
            .take(limit)
            .map(|(_, _, props)| Row {
                node: props.clone(),
                edge: None,
            })
            .collect()
    }

    fn outgoing(&self, from: &NodeKey, edge_label: &str) -> Vec<Row> {
        self.edges
            .iter()
            .filter(|(key, _)| key.from == *from && key.label == edge_label)
            .map(|(key, props)| Row {
                node: self.nodes.get(&key.to).cloned().unwrap_or_default(),
                edge: Some(props.clone()),
            })
            .collect()
    }
}

/// `SET n += props`: a `Null` value removes the property.
fn set_properties(target: &mut Properties, properties: &Properties) {
    for (name, value) in properties {
        if *value == PropertyValue::Null {
            target.remove(name);
        } else {
            target.insert(name.clone(), value.clone());
        }
    }
}

/// Serialized form of the whole graph, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub constraints: BTreeMap<String, String>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An in-process property graph with Neo4j-style merge semantics.
///
/// Cloning is cheap and every clone sees the same graph.
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot previously written by `save_snapshot`.
    pub fn load_snapshot(path: &Path) -> TrajectoryResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        let snapshot: GraphSnapshot = serde_json::from_str(&contents).map_err(|e| TrajectoryError::Io {
            path: path.display().to_string(),
            reason: format!("invalid graph snapshot: {}", e),
        })?;
        info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "graph snapshot loaded"
        );
        Ok(Self {
            state: Arc::new(Mutex::new(GraphState::restore(snapshot))),
        })
    }

    /// `load_snapshot` if `path` exists, otherwise an empty store.
    pub fn open(path: &Path) -> TrajectoryResult<Self> {
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            debug!(path = %path.display(), "no snapshot yet, starting empty");
            Ok(Self::new())
        }
    }

    /// Write the whole graph to `path` as JSON.
    pub fn save_snapshot(&self, path: &Path) -> TrajectoryResult<()> {
        let snapshot = self.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| TrajectoryError::Io {
            path: path.display().to_string(),
            reason: format!("cannot serialize graph snapshot: {}", e),
        })?;
        fs::write(path, json).map_err(|e| io_error(path, e))?;
        info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "graph snapshot saved"
        );
        Ok(())
    }

    pub fn snapshot(&self) -> TrajectoryResult<GraphSnapshot> {
        Ok(self.lock()?.snapshot())
    }

    /// SHA-256 over the canonical JSON snapshot, as lowercase hex.
    ///
    /// Two stores holding the same nodes, edges and properties have the same
    /// fingerprint regardless of write order.
    pub fn fingerprint(&self) -> TrajectoryResult<String> {
        let snapshot = self.snapshot()?;
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| TrajectoryError::StoreUnavailable {
            reason: format!("cannot serialize graph: {}", e),
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn node_count(&self) -> TrajectoryResult<usize> {
        Ok(self.lock()?.nodes.len())
    }

    pub fn edge_count(&self) -> TrajectoryResult<usize> {
        Ok(self.lock()?.edges.len())
    }

    fn lock(&self) -> TrajectoryResult<MutexGuard<'_, GraphState>> {
        self.state.lock().map_err(|e| TrajectoryError::StoreUnavailable {
            reason: format!("graph state lock poisoned: {}", e),
        })
    }
}

fn io_error(path: &Path, e: std::io::Error) -> TrajectoryError {
    TrajectoryError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

// ── GraphStore impl ───────────────────────────────────────────────────────────

impl GraphStore for InMemoryGraphStore {
    fn clear(&self) -> TrajectoryResult<()> {
        let mut state = self.lock()?;
        state.nodes.clear();
        state.edges.clear();
        Ok(())
    }

    /// Declaring a second field for a label that already has one is an error.
    fn ensure_unique(&self, label: &str, field: &str) -> TrajectoryResult<()> {
        let mut state = self.lock()?;
        match state.constraints.get(label) {
            Some(existing) if existing == field => Ok(()),
            Some(existing) => Err(TrajectoryError::StoreWrite {
                element: format!("constraint {}.{}", label, field),
                reason: format!("{} is already unique on '{}'", label, existing),
            }),
            None => {
                debug!(label, field, "unique constraint declared");
                state.constraints.insert(label.to_string(), field.to_string());
                Ok(())
            }
        }
    }

    /// All-or-nothing: every key is checked before anything is written.
    fn upsert_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<()> {
        let mut state = self.lock()?;
        for node in nodes {
            state.check_node_key(&node.key, || format!("{}({})", node.key.label, node.key.value))?;
        }
        for node in nodes {
            state.merge_node(&node.key, &node.properties);
        }
        Ok(())
    }

    fn upsert_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<()> {
        let mut state = self.lock()?;
        for edge in edges {
            state.check_node_key(&edge.from, || edge.describe())?;
            state.check_node_key(&edge.to, || edge.describe())?;
        }
        for edge in edges {
            state.merge_edge(edge);
        }
        Ok(())
    }

    fn query(&self, query: &GraphQuery) -> TrajectoryResult<Vec<Row>> {
        let state = self.lock()?;
        let rows = match query {
            GraphQuery::SearchNodes {
                label,
                fields,
                needle,
                limit,
            } => state.search(label, fields, needle, *limit),
            GraphQuery::Outgoing { from, edge_label } => state.outgoing(from, edge_label),
            GraphQuery::FetchNode { key } => state
                .nodes
                .get(key)
                .map(|props| Row {
                    node: props.clone(),
                    edge: None,
                })
                .into_iter()
                .collect(),
        };
        Ok(rows)
    }
}

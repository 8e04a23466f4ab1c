//! Neo4j implementation of `GraphStore` over Bolt.
//!
//! The driver is async; this store owns a tokio runtime and blocks on each
//! call, bounded by the configured timeout. Writes are grouped by label and
//! key field and sent as one `UNWIND $rows ... MERGE` statement per group,
//! all inside a single transaction per batch.
//!
//! Labels and field names cannot be Cypher parameters, so they are
//! interpolated after checking they are plain identifiers.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    time::Duration,
};

use neo4rs::{query, BoltList, BoltNull, BoltType, Graph, Query};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use trajectory_contracts::{
    error::{TrajectoryError, TrajectoryResult},
    graph::{EdgeRecord, GraphQuery, NodeKey, NodeRecord, Properties, PropertyValue, Row},
};
use trajectory_core::traits::GraphStore;

/// Connection settings.
#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

pub struct Neo4jGraphStore {
    graph: Graph,
    runtime: Runtime,
    timeout: Duration,
}

impl Neo4jGraphStore {
    /// Open a connection. Fails with `StoreUnavailable` or `StoreTimeout`.
    pub fn connect(settings: &Neo4jSettings) -> TrajectoryResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| TrajectoryError::StoreUnavailable {
                reason: format!("cannot start async runtime: {}", e),
            })?;
        let timeout = settings.timeout;
        let graph = block_on_timeout(&runtime, timeout, "connect", async {
            Graph::new(&settings.uri, &settings.user, &settings.password)
                .await
                .map_err(|e| TrajectoryError::StoreUnavailable {
                    reason: format!("cannot connect to {}: {}", settings.uri, e),
                })
        })?;
        info!(uri = %settings.uri, user = %settings.user, "connected to neo4j");
        Ok(Self {
            graph,
            runtime,
            timeout,
        })
    }

    fn block_on<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = TrajectoryResult<T>>,
    ) -> TrajectoryResult<T> {
        block_on_timeout(&self.runtime, self.timeout, operation, fut)
    }

    fn run(&self, operation: &str, q: Query) -> TrajectoryResult<()> {
        self.block_on(operation, async {
            self.graph.run(q).await.map_err(|e| TrajectoryError::StoreUnavailable {
                reason: format!("{} failed: {}", operation, e),
            })
        })
    }

    /// Run write statements in one transaction, mapping any failure to
    /// `StoreWrite` for `element`.
    fn write_all(&self, operation: &str, element: String, statements: Vec<Query>) -> TrajectoryResult<()> {
        let write_error = |e: neo4rs::Error| TrajectoryError::StoreWrite {
            element: element.clone(),
            reason: e.to_string(),
        };
        self.block_on(operation, async {
            let mut txn = self.graph.start_txn().await.map_err(|e| TrajectoryError::StoreUnavailable {
                reason: format!("cannot start transaction: {}", e),
            })?;
            for statement in statements {
                txn.run(statement).await.map_err(write_error)?;
            }
            txn.commit().await.map_err(write_error)
        })
    }

    fn fetch(&self, q: Query, with_edge: bool) -> TrajectoryResult<Vec<Row>> {
        let read_error = |e: String| TrajectoryError::StoreUnavailable {
            reason: format!("query failed: {}", e),
        };
        self.block_on("query", async {
            let mut stream = self.graph.execute(q).await.map_err(|e| read_error(e.to_string()))?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await.map_err(|e| read_error(e.to_string()))? {
                let node: Properties = row.get("node").map_err(|e| read_error(e.to_string()))?;
                let edge = if with_edge {
                    Some(row.get::<Properties>("edge").map_err(|e| read_error(e.to_string()))?)
                } else {
                    None
                };
                rows.push(Row { node, edge });
            }
            Ok(rows)
        })
    }
}

fn block_on_timeout<T>(
    runtime: &Runtime,
    timeout: Duration,
    operation: &str,
    fut: impl Future<Output = TrajectoryResult<T>>,
) -> TrajectoryResult<T> {
    runtime.block_on(async {
        tokio::time::timeout(timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(TrajectoryError::StoreTimeout {
                    operation: operation.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            })
    })
}

// ── Cypher building ───────────────────────────────────────────────────────────

fn ident<'a>(name: &'a str, element: &str) -> TrajectoryResult<&'a str> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(TrajectoryError::StoreWrite {
            element: element.to_string(),
            reason: format!("'{}' is not a valid label or property name", name),
        })
    }
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Null => BoltType::Null(BoltNull),
        PropertyValue::Bool(b) => (*b).into(),
        PropertyValue::Int(i) => (*i).into(),
        PropertyValue::Float(f) => (*f).into(),
        PropertyValue::Text(s) => s.clone().into(),
        PropertyValue::List(items) => {
            BoltType::List(BoltList::from(items.iter().map(to_bolt).collect::<Vec<_>>()))
        }
    }
}

fn to_bolt_map(properties: &Properties) -> HashMap<String, BoltType> {
    properties
        .iter()
        .map(|(k, v)| (k.clone(), to_bolt(v)))
        .collect()
}

fn node_statements(nodes: &[NodeRecord]) -> TrajectoryResult<Vec<Query>> {
    let mut groups: BTreeMap<(&str, &str), Vec<HashMap<String, BoltType>>> = BTreeMap::new();
    for node in nodes {
        let mut row = HashMap::new();
        row.insert("key".to_string(), BoltType::from(node.key.value.clone()));
        row.insert("props".to_string(), BoltType::from(to_bolt_map(&node.properties)));
        groups
            .entry((node.key.label.as_str(), node.key.field.as_str()))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((label, field), rows)| {
            let element = format!("{} nodes", label);
            let cypher = format!(
                "UNWIND $rows AS row MERGE (n:{} {{{}: row.key}}) SET n += row.props",
                ident(label, &element)?,
                ident(field, &element)?
            );
            Ok(query(&cypher).param("rows", rows))
        })
        .collect()
}

fn edge_statements(edges: &[EdgeRecord]) -> TrajectoryResult<Vec<Query>> {
    type Shape<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, Option<&'a str>);
    let mut groups: BTreeMap<Shape<'_>, Vec<HashMap<String, BoltType>>> = BTreeMap::new();
    for edge in edges {
        let mut row = HashMap::new();
        row.insert("from".to_string(), BoltType::from(edge.from.value.clone()));
        row.insert("to".to_string(), BoltType::from(edge.to.value.clone()));
        row.insert("props".to_string(), BoltType::from(to_bolt_map(&edge.properties)));
        if let Some(d) = &edge.discriminator {
            row.insert("disc".to_string(), BoltType::from(d.value.clone()));
        }
        let shape = (
            edge.label.as_str(),
            edge.from.label.as_str(),
            edge.from.field.as_str(),
            edge.to.label.as_str(),
            edge.to.field.as_str(),
            edge.discriminator.as_ref().map(|d| d.field.as_str()),
        );
        groups.entry(shape).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|((label, from_label, from_field, to_label, to_field, disc), rows)| {
            let element = format!("{} edges", label);
            let rel = match disc {
                Some(field) => format!("r:{} {{{}: row.disc}}", ident(label, &element)?, ident(field, &element)?),
                None => format!("r:{}", ident(label, &element)?),
            };
            let cypher = format!(
                "UNWIND $rows AS row \
                 MERGE (a:{} {{{}: row.from}}) \
                 MERGE (b:{} {{{}: row.to}}) \
                 MERGE (a)-[{}]->(b) \
                 SET r += row.props",
                ident(from_label, &element)?,
                ident(from_field, &element)?,
                ident(to_label, &element)?,
                ident(to_field, &element)?,
                rel
            );
            Ok(query(&cypher).param("rows", rows))
        })
        .collect()
}

fn match_key(key: &NodeKey, var: &str) -> TrajectoryResult<String> {
    let element = format!("{}({})", key.label, key.value);
    Ok(format!(
        "({}:{} {{{}: $key}})",
        var,
        ident(&key.label, &element)?,
        ident(&key.field, &element)?
    ))
}

// ── GraphStore impl ───────────────────────────────────────────────────────────

impl GraphStore for Neo4jGraphStore {
    fn clear(&self) -> TrajectoryResult<()> {
        self.run("clear", query("MATCH (n) DETACH DELETE n"))?;
        info!("graph cleared");
        Ok(())
    }

    fn ensure_unique(&self, label: &str, field: &str) -> TrajectoryResult<()> {
        let element = format!("constraint {}.{}", label, field);
        let cypher = format!(
            "CREATE CONSTRAINT {l}_{f}_unique IF NOT EXISTS FOR (n:{l}) REQUIRE n.{f} IS UNIQUE",
            l = ident(label, &element)?,
            f = ident(field, &element)?
        );
        self.run("ensure_unique", query(&cypher))?;
        debug!(label, field, "unique constraint ensured");
        Ok(())
    }

    fn upsert_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let element = match nodes {
            [only] => format!("{}({})", only.key.label, only.key.value),
            _ => format!("batch of {} nodes", nodes.len()),
        };
        self.write_all("upsert_nodes", element, node_statements(nodes)?)
    }

    fn upsert_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<()> {
        if edges.is_empty() {
            return Ok(());
        }
        let element = match edges {
            [only] => only.describe(),
            _ => format!("batch of {} edges", edges.len()),
        };
        self.write_all("upsert_edges", element, edge_statements(edges)?)
    }

    fn query(&self, graph_query: &GraphQuery) -> TrajectoryResult<Vec<Row>> {
        match graph_query {
            GraphQuery::SearchNodes {
                label,
                fields,
                needle,
                limit,
            } => {
                let cypher = format!(
                    "MATCH (n:{}) \
                     WHERE any(f IN $fields WHERE toLower(toString(n[f])) CONTAINS toLower($needle)) \
                     RETURN properties(n) AS node \
                     ORDER BY toString(n[$fields[0]]) \
                     LIMIT $limit",
                    ident(label, "search")?
                );
                let q = query(&cypher)
                    .param("fields", fields.clone())
                    .param("needle", needle.clone())
                    .param("limit", i64::try_from(*limit).unwrap_or(i64::MAX));
                self.fetch(q, false)
            }
            GraphQuery::Outgoing { from, edge_label } => {
                let cypher = format!(
                    "MATCH {}-[r:{}]->(b) RETURN properties(b) AS node, properties(r) AS edge",
                    match_key(from, "a")?,
                    ident(edge_label, "outgoing")?
                );
                self.fetch(query(&cypher).param("key", from.value.clone()), true)
            }
            GraphQuery::FetchNode { key } => {
                let cypher = format!("MATCH {} RETURN properties(n) AS node LIMIT 1", match_key(key, "n")?);
                self.fetch(query(&cypher).param("key", key.value.clone()), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use trajectory_contracts::graph::{Discriminator, HAS_DIAGNOSIS};

    use super::*;

    #[test]
    fn identifiers_are_checked_before_interpolation() {
        assert!(ident("Diagnosis", "x").is_ok());
        assert!(ident("visit_identifier", "x").is_ok());
        assert!(ident("Diagnosis) DETACH DELETE (n", "x").is_err());
        assert!(ident("", "x").is_err());
    }

    #[test]
    fn edges_are_grouped_by_shape() {
        let edge = |id: &str| EdgeRecord {
            label: HAS_DIAGNOSIS.to_string(),
            from: NodeKey::patient("P1"),
            to: NodeKey::diagnosis("A"),
            discriminator: Some(Discriminator {
                field: "visit_identifier".to_string(),
                value: id.to_string(),
            }),
            properties: Properties::new(),
        };
        let statements = edge_statements(&[edge("P1_9040"), edge("P1_9045")]).unwrap();
        assert_eq!(statements.len(), 1);
    }
}

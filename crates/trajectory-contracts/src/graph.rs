//! Property-graph record types exchanged with a `GraphStore`.
//!
//! Writes are expressed as merge-by-key records; reads as typed
//! `GraphQuery` statements that return `Row`s. Store backends translate these
//! into their own query language.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node label for diagnoses.
pub const DIAGNOSIS_LABEL: &str = "Diagnosis";
/// Node label for patients (per-visit graph only).
pub const PATIENT_LABEL: &str = "Patient";
/// Edge label for diagnosis-to-diagnosis progressions.
pub const PROGRESSES_TO: &str = "PROGRESSES_TO";
/// Edge label for patient-to-diagnosis visits.
pub const HAS_DIAGNOSIS: &str = "HAS_DIAGNOSIS";

/// Discriminating property of `HAS_DIAGNOSIS` edges: `{patient_id}_{age_code}`.
pub const VISIT_IDENTIFIER: &str = "visit_identifier";

/// Prefix of the statistics computed over every stratum of an edge.
pub const OVERALL_PREFIX: &str = "overall";

/// Statistic names on `PROGRESSES_TO` edges. Each is written once per prefix
/// (`overall`, then each stratum name) as `{prefix}_{name}`.
pub mod stat {
    pub const FREQUENCY: &str = "frequency";
    pub const MIN_YEARS: &str = "min_years";
    pub const MAX_YEARS: &str = "max_years";
    pub const AVG_YEARS: &str = "avg_years";
    pub const MEDIAN_YEARS: &str = "median_years";
    pub const STD_YEARS: &str = "std_years";
    pub const Q1_YEARS: &str = "q1_years";
    pub const Q3_YEARS: &str = "q3_years";
    /// Raw sorted intervals. Per stratum only.
    pub const INTERVALS: &str = "intervals";
}

/// `stat_property("male", stat::AVG_YEARS)` → `"male_avg_years"`.
pub fn stat_property(prefix: &str, stat: &str) -> String {
    format!("{}_{}", prefix, stat)
}

/// A single property value. Mirrors the scalar and list types a property
/// graph can store; maps are flattened into prefixed keys instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Int(i64::from(i))
    }
}

impl From<u64> for PropertyValue {
    fn from(i: u64) -> Self {
        PropertyValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        PropertyValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Ordered property map. Ordering keeps snapshots and fingerprints stable.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Identifies a node by label and unique key property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: String,
    /// Name of the unique key property (e.g. "code", "id").
    pub field: String,
    pub value: String,
}

impl NodeKey {
    pub fn new(label: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Key of a `Diagnosis` node.
    pub fn diagnosis(code: impl Into<String>) -> Self {
        Self::new(DIAGNOSIS_LABEL, "code", code)
    }

    /// Key of a `Patient` node.
    pub fn patient(id: impl Into<String>) -> Self {
        Self::new(PATIENT_LABEL, "id", id)
    }
}

/// A node to merge by key. `properties` are set on top of existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: NodeKey,
    pub properties: Properties,
}

/// Extra identity for edges that may repeat between the same two nodes,
/// e.g. one `HAS_DIAGNOSIS` edge per visit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Discriminator {
    pub field: String,
    pub value: String,
}

/// An edge to merge by `(label, from, to, discriminator)`.
///
/// Missing endpoints are merged by key before the edge is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub label: String,
    pub from: NodeKey,
    pub to: NodeKey,
    pub discriminator: Option<Discriminator>,
    pub properties: Properties,
}

impl EdgeRecord {
    /// Short human-readable description used in logs and error messages.
    pub fn describe(&self) -> String {
        match &self.discriminator {
            Some(d) => format!(
                "({})-[{} {}={}]->({})",
                self.from.value, self.label, d.field, d.value, self.to.value
            ),
            None => format!("({})-[{}]->({})", self.from.value, self.label, self.to.value),
        }
    }
}

/// Typed, parameterized read statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphQuery {
    /// Nodes with `label` where any of `fields` contains `needle`,
    /// case-insensitively. At most `limit` rows, ordered by key.
    SearchNodes {
        label: String,
        fields: Vec<String>,
        needle: String,
        limit: usize,
    },

    /// Every `edge_label` edge leaving `from`, with the target node.
    Outgoing { from: NodeKey, edge_label: String },

    /// A single node by key. Zero or one row.
    FetchNode { key: NodeKey },
}

/// One result row: the matched node's properties and, for edge queries,
/// the edge's properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub node: Properties,
    pub edge: Option<Properties>,
}

impl Row {
    pub fn node_str(&self, key: &str) -> Option<&str> {
        self.node.get(key).and_then(PropertyValue::as_str)
    }

    pub fn edge_value(&self, key: &str) -> Option<&PropertyValue> {
        self.edge.as_ref().and_then(|e| e.get(key))
    }
}

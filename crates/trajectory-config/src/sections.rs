//! Configuration sections.
//!
//! Every section and field has a default, so an empty document is a valid
//! configuration. Example:
//!
//! ```toml
//! [input]
//! reference_table = "data/bps.csv"
//! patients = "data/patients.csv"
//!
//! [input.reference_columns]
//! code = "CODE_BPS"
//! name = "BPS_PATHOLOGY"
//!
//! [ingestion]
//! mode = "rebuild"
//! unknown_codes = "drop"
//! batch_size = 500
//!
//! [[strata.categories]]
//! name = "male"
//! aliases = ["M", "1"]
//!
//! [store]
//! backend = "neo4j"
//! uri = "bolt://localhost:7687"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use trajectory_contracts::policy::{IngestionMode, UnknownCodePolicy};
use trajectory_core::{PatientColumns, ReferenceColumns, StratumCategory, StratumScheme};

// ── [input] ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Delimited code → name reference table.
    pub reference_table: Option<PathBuf>,
    /// Delimited patient file (id, stratum, visit list).
    pub patients: Option<PathBuf>,
    pub reference_columns: ReferenceColumns,
    pub patient_columns: PatientColumns,
}

// ── [ingestion] ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub mode: IngestionMode,
    pub unknown_codes: UnknownCodePolicy,
    /// Name given to diagnosis nodes created for codes absent from the
    /// reference table under `unknown_codes = "label-unknown"`.
    pub unknown_label: String,
    /// Records per store write.
    pub batch_size: usize,
    /// Parse and aggregate patient shards on the rayon pool.
    pub parallel: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            mode: IngestionMode::default(),
            unknown_codes: UnknownCodePolicy::default(),
            unknown_label: "Unknown".to_string(),
            batch_size: 500,
            parallel: false,
        }
    }
}

// ── [strata] ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub categories: Vec<StratumCategory>,
}

impl StrataConfig {
    pub fn scheme(&self) -> StratumScheme {
        StratumScheme::new(self.categories.clone())
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            categories: StratumScheme::default().categories().to_vec(),
        }
    }
}

// ── [store] ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// In-process graph, optionally persisted as a JSON snapshot.
    #[default]
    Memory,
    /// Neo4j over Bolt. Requires the `neo4j` feature.
    Neo4j,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Snapshot file for the memory backend. Loaded on open if present,
    /// written back after ingestion.
    pub snapshot: Option<PathBuf>,
    pub uri: String,
    pub user: String,
    /// Name of the environment variable holding the database password.
    pub password_env: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            snapshot: None,
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password_env: "NEO4J_PASSWORD".to_string(),
            timeout_ms: 30_000,
            max_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

// ── [query] ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of cached mention → code resolutions.
    pub cache_capacity: u64,
    /// Cached resolutions expire after this many seconds. `None` keeps them
    /// for the life of the process.
    pub cache_ttl_secs: Option<u64>,
    /// Candidate diagnoses fetched per resolution; the first is used.
    pub match_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            cache_ttl_secs: None,
            match_limit: 5,
        }
    }
}

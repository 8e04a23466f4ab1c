//! # trajectory-config
//!
//! TOML configuration for ingestion and querying.
//!
//! `TrajectoryConfig` covers input paths and column names, ingestion policy,
//! the stratum scheme, the graph store connection and the query cache.
//! Every field has a default; `validate` rejects combinations that would
//! produce an ambiguous graph.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trajectory_config::TrajectoryConfig;
//!
//! let config = TrajectoryConfig::from_file(Path::new("trajectory.toml"))?.with_env_overrides();
//! let strata = config.strata.scheme();
//! ```

pub mod loader;
pub mod sections;

pub use loader::TrajectoryConfig;
pub use sections::{IngestionConfig, InputConfig, QueryConfig, StoreBackend, StoreConfig, StrataConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────

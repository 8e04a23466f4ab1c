//! # trajectory-graph
//!
//! The graph persistence layer: ingestion runs that turn patient rows into
//! either the trajectory-statistics graph (`rebuild`) or the per-visit graph
//! (`merge-visits`), written through any `GraphStore`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trajectory_graph::Ingestor;
//!
//! let ingestor = Ingestor::new(&store, &dictionary, &strata, config.ingestion.clone());
//! let report = ingestor.run(PatientRowReader::open(&path, &columns)?)?;
//! ```

pub mod ingest;
pub mod records;
pub mod writer;

pub use ingest::Ingestor;
pub use writer::{BatchWriter, WriteTally};

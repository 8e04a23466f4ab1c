//! Store acquisition for one CLI run.

use std::{sync::Arc, time::Duration};

use tracing::info;

use trajectory_config::{StoreBackend, StoreConfig};
use trajectory_contracts::error::{TrajectoryError, TrajectoryResult};
use trajectory_core::traits::GraphStore;
use trajectory_store::{InMemoryGraphStore, RetryingStore};

/// The store a command works against, plus whatever must happen to it when
/// the command is done.
pub enum OpenedStore {
    Memory {
        store: InMemoryGraphStore,
        settings: StoreConfig,
    },
    #[cfg(feature = "neo4j")]
    Neo4j(Arc<dyn GraphStore>),
}

impl OpenedStore {
    pub fn open(settings: &StoreConfig) -> TrajectoryResult<Self> {
        match settings.backend {
            StoreBackend::Memory => {
                let store = match &settings.snapshot {
                    Some(path) => InMemoryGraphStore::open(path)?,
                    None => InMemoryGraphStore::new(),
                };
                info!(
                    snapshot = ?settings.snapshot,
                    nodes = store.node_count()?,
                    edges = store.edge_count()?,
                    "memory store opened"
                );
                Ok(OpenedStore::Memory {
                    store,
                    settings: settings.clone(),
                })
            }
            StoreBackend::Neo4j => open_neo4j(settings),
        }
    }

    /// A retrying handle to the underlying store.
    pub fn handle(&self) -> Arc<dyn GraphStore> {
        match self {
            OpenedStore::Memory { store, settings, .. } => Arc::new(RetryingStore::new(
                store.clone(),
                settings.max_retries,
                Duration::from_millis(settings.retry_backoff_ms),
            )),
            #[cfg(feature = "neo4j")]
            OpenedStore::Neo4j(store) => Arc::clone(store),
        }
    }

    /// Persist the memory store's snapshot, if one is configured.
    pub fn close(&self) -> TrajectoryResult<()> {
        match self {
            OpenedStore::Memory { store, settings } => match &settings.snapshot {
                Some(path) => store.save_snapshot(path),
                None => Ok(()),
            },
            #[cfg(feature = "neo4j")]
            OpenedStore::Neo4j(_) => Ok(()),
        }
    }

    pub fn fingerprint(&self) -> TrajectoryResult<String> {
        match self {
            OpenedStore::Memory { store, .. } => store.fingerprint(),
            #[cfg(feature = "neo4j")]
            OpenedStore::Neo4j(_) => Err(TrajectoryError::ConfigError {
                reason: "fingerprint is only available for the memory backend".to_string(),
            }),
        }
    }
}

#[cfg(feature = "neo4j")]
fn open_neo4j(settings: &StoreConfig) -> TrajectoryResult<OpenedStore> {
    use trajectory_store::{Neo4jGraphStore, Neo4jSettings};

    let password = std::env::var(&settings.password_env).map_err(|_| TrajectoryError::ConfigError {
        reason: format!("environment variable {} is not set", settings.password_env),
    })?;
    let store = Neo4jGraphStore::connect(&Neo4jSettings {
        uri: settings.uri.clone(),
        user: settings.user.clone(),
        password,
        timeout: Duration::from_millis(settings.timeout_ms),
    })?;
    Ok(OpenedStore::Neo4j(Arc::new(RetryingStore::new(
        store,
        settings.max_retries,
        Duration::from_millis(settings.retry_backoff_ms),
    ))))
}

#[cfg(not(feature = "neo4j"))]
fn open_neo4j(_: &StoreConfig) -> TrajectoryResult<OpenedStore> {
    Err(TrajectoryError::ConfigError {
        reason: "store.backend = \"neo4j\" needs a build with the `neo4j` feature".to_string(),
    })
}

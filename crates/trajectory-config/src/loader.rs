//! Loading, environment overrides and validation.

use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use trajectory_contracts::{
    diagnosis::Stratum,
    error::{TrajectoryError, TrajectoryResult},
    graph::OVERALL_PREFIX,
};

use crate::sections::{IngestionConfig, InputConfig, QueryConfig, StoreConfig, StrataConfig};

/// Environment variables that override `[store]` connection settings.
pub const URI_ENV: &str = "NEO4J_URI";
pub const USER_ENV: &str = "NEO4J_USERNAME";

/// The whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub input: InputConfig,
    pub ingestion: IngestionConfig,
    pub strata: StrataConfig,
    pub store: StoreConfig,
    pub query: QueryConfig,
}

impl TrajectoryConfig {
    /// Parse and validate a TOML document.
    ///
    /// Returns `TrajectoryError::ConfigError` if the TOML is malformed, does
    /// not match the schema, or fails `validate`.
    pub fn from_toml_str(s: &str) -> TrajectoryResult<Self> {
        let config: TrajectoryConfig = toml::from_str(s).map_err(|e| TrajectoryError::ConfigError {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it with `from_toml_str`.
    pub fn from_file(path: &Path) -> TrajectoryResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TrajectoryError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply `NEO4J_URI` / `NEO4J_USERNAME` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(uri) = get(URI_ENV) {
            debug!(uri = %uri, "store uri overridden from environment");
            self.store.uri = uri;
        }
        if let Some(user) = get(USER_ENV) {
            self.store.user = user;
        }
        self
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> TrajectoryResult<()> {
        if self.ingestion.batch_size == 0 {
            return Err(invalid("ingestion.batch_size must be at least 1"));
        }
        if self.ingestion.unknown_label.trim().is_empty() {
            return Err(invalid("ingestion.unknown_label must not be empty"));
        }
        if self.query.match_limit == 0 {
            return Err(invalid("query.match_limit must be at least 1"));
        }
        if self.query.cache_ttl_secs == Some(0) {
            return Err(invalid("query.cache_ttl_secs must be positive when set"));
        }

        let mut seen = BTreeSet::new();
        for category in &self.strata.categories {
            let name = category.name.as_str();
            if !is_property_identifier(name) {
                return Err(invalid(format!(
                    "stratum name '{}' must be lowercase letters, digits and '_', starting with a letter",
                    name
                )));
            }
            if name == Stratum::UNKNOWN_NAME {
                return Err(invalid(format!(
                    "stratum name '{}' is reserved for unrecognized values",
                    name
                )));
            }
            // Per-stratum properties share the `{prefix}_{stat}` namespace
            // with the overall statistics.
            if name == OVERALL_PREFIX {
                return Err(invalid(format!(
                    "stratum name '{}' is reserved for statistics over all strata",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(invalid(format!("duplicate stratum name '{}'", name)));
            }
            if category.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(invalid(format!("stratum '{}' has an empty alias", name)));
            }
        }
        Ok(())
    }
}

/// Stratum names become property-name prefixes (`male_avg_years`).
fn is_property_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn invalid(reason: impl Into<String>) -> TrajectoryError {
    TrajectoryError::ConfigError { reason: reason.into() }
}

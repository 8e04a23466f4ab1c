//! `ComplicationQuery`: diagnosis resolution and complication retrieval.
//!
//! Resolution is a case-insensitive substring match on a diagnosis node's
//! code or name. Successful resolutions are cached per exact input text in a
//! bounded cache; misses are not cached, so a later ingestion can make a
//! mention resolvable without a restart.

use std::{sync::Arc, time::Duration};

use moka::sync::Cache;
use tracing::{debug, warn};

use trajectory_config::QueryConfig;
use trajectory_contracts::{
    diagnosis::DiagnosisCode,
    error::TrajectoryResult,
    graph::{stat, stat_property, GraphQuery, NodeKey, PropertyValue, Row, DIAGNOSIS_LABEL, OVERALL_PREFIX, PROGRESSES_TO},
    query::{Complication, Resolution},
};
use trajectory_core::traits::GraphStore;

/// Read-side façade over a trajectory graph. `Send + Sync`; share it by `Arc`.
pub struct ComplicationQuery {
    store: Arc<dyn GraphStore>,
    cache: Cache<String, DiagnosisCode>,
    match_limit: usize,
}

impl ComplicationQuery {
    pub fn new(store: Arc<dyn GraphStore>, settings: &QueryConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(settings.cache_capacity);
        if let Some(ttl) = settings.cache_ttl_secs {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        Self {
            store,
            cache: builder.build(),
            match_limit: settings.match_limit.max(1),
        }
    }

    /// Map free text to a diagnosis code. Blank text never matches.
    pub fn resolve_diagnosis(&self, text: &str) -> TrajectoryResult<Resolution> {
        if let Some(code) = self.cache.get(text) {
            debug!(mention = text, code = %code, "diagnosis resolved from cache");
            return Ok(Resolution::Found(code));
        }

        let needle = text.trim();
        if needle.is_empty() {
            return Ok(Resolution::NotFound);
        }

        let rows = self.store.query(&GraphQuery::SearchNodes {
            label: DIAGNOSIS_LABEL.to_string(),
            fields: vec!["code".to_string(), "name".to_string()],
            needle: needle.to_string(),
            limit: self.match_limit,
        })?;

        match rows.first().and_then(|row| row.node_str("code")) {
            Some(code) => {
                let code = DiagnosisCode::new(code);
                debug!(mention = text, code = %code, candidates = rows.len(), "diagnosis resolved");
                self.cache.insert(text.to_string(), code.clone());
                Ok(Resolution::Found(code))
            }
            None => {
                debug!(mention = text, "no diagnosis matches");
                Ok(Resolution::NotFound)
            }
        }
    }

    /// Outgoing progressions of `code`, most frequent first.
    ///
    /// With `max_years`, an edge is kept when its average, median or maximum
    /// interval is at most `max_years`. Ties in frequency are ordered by code.
    pub fn get_complications(
        &self,
        code: &DiagnosisCode,
        max_years: Option<u32>,
    ) -> TrajectoryResult<Vec<Complication>> {
        let rows = self.store.query(&GraphQuery::Outgoing {
            from: NodeKey::diagnosis(code.as_str()),
            edge_label: PROGRESSES_TO.to_string(),
        })?;

        let mut complications: Vec<Complication> = rows
            .iter()
            .filter_map(|row| {
                let parsed = complication_from_row(row);
                if parsed.is_none() {
                    warn!(from = %code, to = ?row.node_str("code"), "skipping progression edge without statistics");
                }
                parsed
            })
            .filter(|c| max_years.map_or(true, |years| within(c, years)))
            .collect();

        complications.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.complication_code.cmp(&b.complication_code))
        });
        for complication in &mut complications {
            complication.avg_years = round3(complication.avg_years);
        }

        debug!(code = %code, max_years = ?max_years, found = complications.len(), "complications retrieved");
        Ok(complications)
    }
}

fn within(complication: &Complication, years: u32) -> bool {
    let limit = f64::from(years);
    complication.avg_years <= limit
        || complication.median_years <= limit
        || complication.max_years <= years
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn complication_from_row(row: &Row) -> Option<Complication> {
    let edge = |name: &str| row.edge_value(&stat_property(OVERALL_PREFIX, name));
    let years = |name: &str| {
        edge(name)
            .and_then(PropertyValue::as_i64)
            .and_then(|v| u32::try_from(v).ok())
    };

    let code = row.node_str("code")?;
    Some(Complication {
        complication_code: DiagnosisCode::new(code),
        name: row.node_str("name").unwrap_or(code).to_string(),
        avg_years: edge(stat::AVG_YEARS).and_then(PropertyValue::as_f64)?,
        median_years: edge(stat::MEDIAN_YEARS).and_then(PropertyValue::as_f64)?,
        min_years: years(stat::MIN_YEARS)?,
        max_years: years(stat::MAX_YEARS)?,
        frequency: edge(stat::FREQUENCY)
            .and_then(PropertyValue::as_i64)
            .and_then(|v| u64::try_from(v).ok())?,
    })
}

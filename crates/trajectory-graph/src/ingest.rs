//! Ingestion runs: raw patient rows → graph.
//!
//! One `Ingestor::run` call is one run with its own `RunId`:
//!
//! 1. Parse every row (rows that fail are logged and counted, never fatal).
//! 2. Depending on `IngestionMode`:
//!    - `Rebuild`: aggregate transitions, clear the store, declare
//!      `Diagnosis.code` unique, write all dictionary diagnoses and one
//!      `PROGRESSES_TO` edge per observed pair.
//!    - `MergeVisits`: declare `Diagnosis.code` and `Patient.id` unique,
//!      merge patients, their diagnoses and one `HAS_DIAGNOSIS` edge per
//!      visit and code. Existing data is kept.
//! 3. Return an `IngestionReport`.
//!
//! Store failures during `clear` or constraint creation abort the run.

use std::collections::BTreeSet;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use trajectory_config::IngestionConfig;
use trajectory_contracts::{
    diagnosis::{DiagnosisCode, PatientRecord},
    error::TrajectoryResult,
    graph::{NodeRecord, DIAGNOSIS_LABEL, PATIENT_LABEL},
    policy::IngestionMode,
    report::{IngestionReport, ParseTally, RunId},
};
use trajectory_core::{
    traits::GraphStore, transitions, CodeDictionary, ParsedPatient, RawPatientRow, StratumScheme,
    TransitionAccumulator, VisitParser,
};

use crate::{
    records,
    writer::{BatchWriter, WriteTally},
};

/// Drives ingestion runs against one store.
pub struct Ingestor<'a> {
    store: &'a dyn GraphStore,
    dictionary: &'a CodeDictionary,
    strata: &'a StratumScheme,
    settings: IngestionConfig,
}

/// Patients that parsed, and what it took to get them.
struct ParsedBatch {
    records: Vec<PatientRecord>,
    tally: ParseTally,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        store: &'a dyn GraphStore,
        dictionary: &'a CodeDictionary,
        strata: &'a StratumScheme,
        settings: IngestionConfig,
    ) -> Self {
        Self {
            store,
            dictionary,
            strata,
            settings,
        }
    }

    /// Ingest every row in the configured mode.
    pub fn run<I>(&self, rows: I) -> TrajectoryResult<IngestionReport>
    where
        I: IntoIterator<Item = TrajectoryResult<RawPatientRow>>,
    {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let mode = self.settings.mode;

        info!(
            run_id = %run_id,
            mode = %mode,
            parallel = self.settings.parallel,
            batch_size = self.settings.batch_size,
            "ingestion run starting"
        );

        let parsed = self.parse_all(&run_id, rows);
        let writer = BatchWriter::new(self.store, self.settings.batch_size, &run_id);

        let (transitions, nodes, edges) = match mode {
            IngestionMode::Rebuild => self.rebuild(&run_id, &writer, &parsed.records)?,
            IngestionMode::MergeVisits => {
                let (nodes, edges) = self.merge_visits(&run_id, &writer, &parsed.records)?;
                (0, nodes, edges)
            }
        };

        let report = IngestionReport {
            run_id,
            mode,
            started_at,
            finished_at: Utc::now(),
            parse: parsed.tally,
            transitions,
            nodes_written: nodes.written,
            edges_written: edges.written,
            write_failures: nodes.failed + edges.failed,
        };

        info!(
            run_id = %report.run_id,
            rows_read = report.parse.rows_read,
            rows_skipped = report.parse.rows_skipped,
            transitions = report.transitions,
            nodes_written = report.nodes_written,
            edges_written = report.edges_written,
            write_failures = report.write_failures,
            "ingestion run finished"
        );
        Ok(report)
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    fn parse_all<I>(&self, run_id: &RunId, rows: I) -> ParsedBatch
    where
        I: IntoIterator<Item = TrajectoryResult<RawPatientRow>>,
    {
        let parser = VisitParser::new(self.dictionary, self.strata, self.settings.unknown_codes);
        let parse_one = |row: TrajectoryResult<RawPatientRow>| -> Option<ParsedPatient> {
            let parsed = row.and_then(|raw| parser.parse(&raw));
            match parsed {
                Ok(patient) => Some(patient),
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "skipping patient row");
                    None
                }
            }
        };

        let outcomes: Vec<Option<ParsedPatient>> = if self.settings.parallel {
            let rows: Vec<_> = rows.into_iter().collect();
            rows.into_par_iter().map(parse_one).collect()
        } else {
            rows.into_iter().map(parse_one).collect()
        };

        let mut batch = ParsedBatch {
            records: Vec::with_capacity(outcomes.len()),
            tally: ParseTally::default(),
        };
        for outcome in outcomes {
            batch.tally.rows_read += 1;
            match outcome {
                Some(patient) => {
                    batch.tally.visits_skipped += patient.diagnostics.visits_skipped;
                    batch.tally.codes_dropped += patient.diagnostics.codes_dropped;
                    batch.records.push(patient.record);
                }
                None => batch.tally.rows_skipped += 1,
            }
        }

        debug!(
            run_id = %run_id,
            patients = batch.records.len(),
            rows_skipped = batch.tally.rows_skipped,
            "rows parsed"
        );
        batch
    }

    fn accumulate(&self, patients: &[PatientRecord]) -> TransitionAccumulator {
        if self.settings.parallel {
            patients
                .par_iter()
                .fold(TransitionAccumulator::new, |mut acc, record| {
                    acc.record_all(transitions::extract_patient(record));
                    acc
                })
                .reduce(TransitionAccumulator::new, |mut left, right| {
                    left.merge(right);
                    left
                })
        } else {
            let mut acc = TransitionAccumulator::new();
            for record in patients {
                acc.record_all(transitions::extract_patient(record));
            }
            acc
        }
    }

    // ── Modes ─────────────────────────────────────────────────────────────────

    fn rebuild(
        &self,
        run_id: &RunId,
        writer: &BatchWriter<'_>,
        patients: &[PatientRecord],
    ) -> TrajectoryResult<(u64, WriteTally, WriteTally)> {
        let acc = self.accumulate(patients);
        let tuples = acc.tuple_count();
        info!(run_id = %run_id, tuples, pairs = acc.pair_count(), "transitions aggregated");

        let mut nodes: Vec<NodeRecord> = self
            .dictionary
            .iter()
            .map(|(code, name)| records::diagnosis_node(code, name))
            .collect();
        let unknown: BTreeSet<&DiagnosisCode> = acc.codes().filter(|c| !self.dictionary.contains(c)).collect();
        nodes.extend(
            unknown
                .into_iter()
                .map(|code| records::diagnosis_node(code, &self.settings.unknown_label)),
        );
        let edges: Vec<_> = acc.finish().iter().map(records::progression_edge).collect();

        self.store.clear()?;
        info!(run_id = %run_id, "store cleared for rebuild");
        self.store.ensure_unique(DIAGNOSIS_LABEL, "code")?;

        let node_tally = writer.write_nodes(&nodes)?;
        let edge_tally = writer.write_edges(&edges)?;
        Ok((tuples, node_tally, edge_tally))
    }

    fn merge_visits(
        &self,
        run_id: &RunId,
        writer: &BatchWriter<'_>,
        patients: &[PatientRecord],
    ) -> TrajectoryResult<(WriteTally, WriteTally)> {
        self.store.ensure_unique(DIAGNOSIS_LABEL, "code")?;
        self.store.ensure_unique(PATIENT_LABEL, "id")?;

        let codes: BTreeSet<&DiagnosisCode> = patients
            .iter()
            .flat_map(|r| r.visits.iter().flat_map(|v| v.codes.iter()))
            .collect();
        let mut nodes: Vec<NodeRecord> = patients.iter().map(records::patient_node).collect();
        nodes.extend(codes.into_iter().map(|code| {
            let name = self
                .dictionary
                .name_of(code)
                .unwrap_or(&self.settings.unknown_label);
            records::diagnosis_node(code, name)
        }));
        let edges: Vec<_> = patients.iter().flat_map(records::visit_edges).collect();
        debug!(run_id = %run_id, nodes = nodes.len(), edges = edges.len(), "visit graph prepared");

        let node_tally = writer.write_nodes(&nodes)?;
        let edge_tally = writer.write_edges(&edges)?;
        Ok((node_tally, edge_tally))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use trajectory_contracts::{
        error::TrajectoryError,
        graph::{EdgeRecord, GraphQuery, Row},
        policy::UnknownCodePolicy,
    };
    use trajectory_core::PatientColumns;
    use trajectory_core::PatientRowReader;
    use trajectory_store::InMemoryGraphStore;

    use super::*;

    /// Records the order of calls; optionally refuses `clear`.
    #[derive(Default)]
    struct CallLog {
        calls: Mutex<Vec<String>>,
        refuse_clear: bool,
    }

    impl GraphStore for CallLog {
        fn clear(&self) -> TrajectoryResult<()> {
            if self.refuse_clear {
                return Err(TrajectoryError::StoreUnavailable {
                    reason: "down".to_string(),
                });
            }
            self.calls.lock().unwrap().push("clear".to_string());
            Ok(())
        }
        fn ensure_unique(&self, label: &str, field: &str) -> TrajectoryResult<()> {
            self.calls.lock().unwrap().push(format!("unique {label}.{field}"));
            Ok(())
        }
        fn upsert_nodes(&self, nodes: &[NodeRecord]) -> TrajectoryResult<()> {
            self.calls.lock().unwrap().push(format!("nodes {}", nodes.len()));
            Ok(())
        }
        fn upsert_edges(&self, edges: &[EdgeRecord]) -> TrajectoryResult<()> {
            self.calls.lock().unwrap().push(format!("edges {}", edges.len()));
            Ok(())
        }
        fn query(&self, _: &GraphQuery) -> TrajectoryResult<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    const PATIENTS: &str = "id,sex,visits\n\
                            P1,M,\"[['9040', 'A'], ['9045', 'B', 'C']]\"\n\
                            P2,F,\"[['9030', 'A'], ['9031', 'X']]\"\n\
                            P3,NA,\"not a list\"\n";

    fn rows() -> Vec<TrajectoryResult<RawPatientRow>> {
        PatientRowReader::from_reader(PATIENTS.as_bytes(), &PatientColumns::default())
            .unwrap()
            .collect()
    }

    fn dictionary() -> CodeDictionary {
        CodeDictionary::from_pairs([("A", "Diabetes"), ("B", "Retinopathy"), ("C", "Nephropathy")])
    }

    #[test]
    fn rebuild_clears_then_constrains_then_writes() {
        let store = CallLog::default();
        let dict = dictionary();
        let strata = StratumScheme::default();
        let ingestor = Ingestor::new(&store, &dict, &strata, IngestionConfig::default());

        let report = ingestor.run(rows()).unwrap();

        assert_eq!(report.mode, IngestionMode::Rebuild);
        assert_eq!(report.parse.rows_read, 3);
        assert_eq!(report.parse.rows_skipped, 1);
        // X is not in the dictionary and is dropped.
        assert_eq!(report.parse.codes_dropped, 1);
        assert_eq!(report.transitions, 2);
        assert_eq!(report.nodes_written, 3);
        assert_eq!(report.edges_written, 2);
        assert_eq!(
            *store.calls.lock().unwrap(),
            vec!["clear", "unique Diagnosis.code", "nodes 3", "edges 2"]
        );
    }

    #[test]
    fn label_unknown_adds_nodes_for_unlisted_codes() {
        let store = CallLog::default();
        let dict = dictionary();
        let strata = StratumScheme::default();
        let settings = IngestionConfig {
            unknown_codes: UnknownCodePolicy::LabelUnknown,
            ..IngestionConfig::default()
        };
        let report = Ingestor::new(&store, &dict, &strata, settings).run(rows()).unwrap();

        assert_eq!(report.parse.codes_dropped, 0);
        assert_eq!(report.transitions, 3);
        assert_eq!(report.nodes_written, 4);
    }

    #[test]
    fn merge_visits_never_clears() {
        let store = CallLog::default();
        let dict = dictionary();
        let strata = StratumScheme::default();
        let settings = IngestionConfig {
            mode: IngestionMode::MergeVisits,
            ..IngestionConfig::default()
        };
        let report = Ingestor::new(&store, &dict, &strata, settings).run(rows()).unwrap();

        let calls = store.calls.lock().unwrap();
        assert!(!calls.contains(&"clear".to_string()));
        assert_eq!(calls[0], "unique Diagnosis.code");
        assert_eq!(calls[1], "unique Patient.id");
        // Two patients plus diagnoses A, B, C; one edge per (visit, code).
        assert_eq!(report.nodes_written, 5);
        assert_eq!(report.edges_written, 4);
        assert_eq!(report.transitions, 0);
    }

    #[test]
    fn unavailable_store_during_clear_is_fatal() {
        let store = CallLog {
            refuse_clear: true,
            ..CallLog::default()
        };
        let dict = dictionary();
        let strata = StratumScheme::default();
        let result = Ingestor::new(&store, &dict, &strata, IngestionConfig::default()).run(rows());
        assert!(matches!(result, Err(TrajectoryError::StoreUnavailable { .. })));
    }

    /// Enough patients that rayon splits the work across several folds.
    fn many_rows() -> Vec<TrajectoryResult<RawPatientRow>> {
        let sexes = ["M", "F", "NA", "2"];
        let codes = ["A", "B", "C"];
        (0..400u32)
            .map(|i| {
                let first = codes[(i % 3) as usize];
                let second = codes[((i / 3) % 3) as usize];
                let third = codes[((i / 7) % 3) as usize];
                Ok(RawPatientRow {
                    line: u64::from(i) + 2,
                    id: format!("P{i}"),
                    stratum: Some(sexes[(i % 4) as usize].to_string()),
                    visits: format!(
                        "[['90{:02}', '{first}'], ['90{:02}', '{second}', '{third}']]",
                        20 + i % 30,
                        50 + i % 17
                    ),
                })
            })
            .collect()
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let dict = dictionary();
        let strata = StratumScheme::default();

        let sequential = InMemoryGraphStore::new();
        let a = Ingestor::new(&sequential, &dict, &strata, IngestionConfig::default())
            .run(many_rows())
            .unwrap();

        let parallel = InMemoryGraphStore::new();
        let settings = IngestionConfig {
            parallel: true,
            ..IngestionConfig::default()
        };
        let b = Ingestor::new(&parallel, &dict, &strata, settings).run(many_rows()).unwrap();

        assert_eq!(a.parse, b.parse);
        assert_eq!(a.transitions, b.transitions);
        assert_eq!(a.transitions, 800);
        assert_eq!(a.edges_written, b.edges_written);
        assert_eq!(sequential.edge_count().unwrap(), 9);
        assert_eq!(sequential.fingerprint().unwrap(), parallel.fingerprint().unwrap());
    }
}

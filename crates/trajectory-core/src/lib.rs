//! # trajectory-core
//!
//! The trajectory-graph construction algorithm and the trait seams around it.
//!
//! This crate provides:
//! - The collaborator traits (`GraphStore`, `IntentExtractor`, `Narrator`)
//! - `CodeDictionary`, the code → name reference mapping
//! - `VisitParser` and `PatientRowReader`, raw rows → age-ordered events
//! - `transitions::extract`, events → consecutive transition tuples
//! - `TransitionAccumulator`, tuples → per-edge interval statistics
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trajectory_core::{CodeDictionary, StratumScheme, TransitionAccumulator, VisitParser};
//!
//! let parser = VisitParser::new(&dictionary, &strata, UnknownCodePolicy::Drop);
//! let mut acc = TransitionAccumulator::new();
//! for row in rows {
//!     let patient = parser.parse(&row)?;
//!     acc.record_all(transitions::extract_patient(&patient.record));
//! }
//! let edges = acc.finish();
//! ```

pub mod aggregate;
pub mod dictionary;
pub mod literal;
pub mod parser;
pub mod stats;
pub mod strata;
pub mod traits;
pub mod transitions;

pub use aggregate::TransitionAccumulator;
pub use dictionary::{CodeDictionary, ReferenceColumns};
pub use parser::{ParsedPatient, PatientColumns, PatientRowReader, RawPatientRow, VisitParser};
pub use strata::{StratumCategory, StratumScheme};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use trajectory_contracts::policy::UnknownCodePolicy;

    use super::*;

    fn dictionary() -> CodeDictionary {
        CodeDictionary::from_pairs([("A", "Diabetes"), ("B", "Retinopathy"), ("C", "Nephropathy")])
    }

    fn rows() -> Vec<RawPatientRow> {
        let text = "id,sex,visits\n\
                    P1,M,\"[['9040', 'A'], ['9045', 'B', 'C']]\"\n\
                    P2,F,\"[['9030', 'A'], ['9031', 'B'], ['9040', 'C']]\"\n\
                    P3,NA,\"[['9050', 'A'], ['9052', 'B']]\"\n\
                    P4,M,\"[['9050', 'A'\"\n";
        PatientRowReader::from_reader(text.as_bytes(), &PatientColumns::default())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn aggregate(rows: &[RawPatientRow]) -> Vec<trajectory_contracts::trajectory::ProgressionEdge> {
        let dict = dictionary();
        let strata = StratumScheme::default();
        let parser = VisitParser::new(&dict, &strata, UnknownCodePolicy::Drop);
        let mut acc = TransitionAccumulator::new();
        for row in rows {
            if let Ok(patient) = parser.parse(row) {
                acc.record_all(transitions::extract_patient(&patient.record));
            }
        }
        acc.finish()
    }

    /// The worked example: P1 with events (40,A), (45,B), (45,C).
    #[test]
    fn patient_p1_yields_a_to_b_and_b_to_c() {
        let dict = dictionary();
        let strata = StratumScheme::default();
        let parser = VisitParser::new(&dict, &strata, UnknownCodePolicy::Drop);

        let p1 = parser.parse(&rows()[0]).unwrap();
        let tuples = transitions::extract_patient(&p1.record);
        let got: Vec<(&str, &str, u32)> = tuples
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str(), t.interval))
            .collect();

        assert_eq!(got, vec![("A", "B", 5), ("B", "C", 0)]);
    }

    #[test]
    fn tuple_count_matches_valid_events_for_every_patient() {
        let dict = dictionary();
        let strata = StratumScheme::default();
        let parser = VisitParser::new(&dict, &strata, UnknownCodePolicy::Drop);

        for row in rows() {
            let Ok(patient) = parser.parse(&row) else { continue };
            let expected = patient.record.events.len().saturating_sub(1);
            assert_eq!(transitions::extract_patient(&patient.record).len(), expected);
        }
    }

    #[test]
    fn end_to_end_aggregation_over_file() {
        let edges = aggregate(&rows());
        let ab = edges
            .iter()
            .find(|e| e.from.as_str() == "A" && e.to.as_str() == "B")
            .unwrap();

        // P1: 5 (male), P2: 1 (female), P3: 2 (unknown). P4 is malformed.
        assert_eq!(ab.overall.count, 3);
        assert_eq!(ab.overall.min, 1);
        assert_eq!(ab.overall.max, 5);
        assert_eq!(ab.overall.median, 2.0);
        assert_eq!(ab.overall.q1, None);
        assert_eq!(ab.strata.len(), 3);
    }

    #[test]
    fn aggregating_the_same_dataset_twice_is_identical() {
        let input = rows();
        assert_eq!(aggregate(&input), aggregate(&input));

        let mut reversed = input.clone();
        reversed.reverse();
        assert_eq!(aggregate(&input), aggregate(&reversed));
    }
}

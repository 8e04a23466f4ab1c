//! # trajectory-contracts
//!
//! Shared types, graph record shapes, and errors for the disease trajectory
//! graph.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod diagnosis;
pub mod error;
pub mod graph;
pub mod policy;
pub mod query;
pub mod report;
pub mod trajectory;

#[cfg(test)]
mod tests {
    use super::*;
    use diagnosis::{DiagnosisCode, ParsedVisit, Stratum};
    use error::TrajectoryError;
    use graph::{Discriminator, EdgeRecord, NodeKey, PropertyValue, HAS_DIAGNOSIS};
    use policy::{IngestionMode, UnknownCodePolicy};
    use query::AnswerFailure;
    use report::{ParseTally, RunId};

    // ── Stratum ──────────────────────────────────────────────────────────────

    #[test]
    fn unknown_stratum_never_equals_a_known_category() {
        assert_ne!(Stratum::Unknown, Stratum::Known("unknown".to_string()));
        assert_eq!(Stratum::Unknown.as_str(), "unknown");
        assert!(Stratum::Unknown.is_unknown());
        assert!(!Stratum::Known("male".to_string()).is_unknown());
    }

    #[test]
    fn visit_identifier_joins_patient_and_age_code() {
        let visit = ParsedVisit {
            age_code: "9070".to_string(),
            age: 70,
            codes: vec![DiagnosisCode::new("A")],
        };
        assert_eq!(visit.identifier("P1"), "P1_9070");
    }

    // ── PropertyValue ────────────────────────────────────────────────────────

    #[test]
    fn property_value_numeric_view_widens_integers() {
        assert_eq!(PropertyValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(PropertyValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(PropertyValue::Text("x".into()).as_f64(), None);
    }

    #[test]
    fn property_value_untagged_json_shape() {
        let list: PropertyValue = vec![1u32, 2, 3].into();
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, "[1,2,3]");

        let decoded: PropertyValue = serde_json::from_str("4.0").unwrap();
        assert_eq!(decoded, PropertyValue::Float(4.0));
        let decoded: PropertyValue = serde_json::from_str("null").unwrap();
        assert_eq!(decoded, PropertyValue::Null);
    }

    #[test]
    fn edge_describe_includes_discriminator() {
        let edge = EdgeRecord {
            label: HAS_DIAGNOSIS.to_string(),
            from: NodeKey::patient("P1"),
            to: NodeKey::diagnosis("A"),
            discriminator: Some(Discriminator {
                field: "visit_identifier".to_string(),
                value: "P1_9040".to_string(),
            }),
            properties: Default::default(),
        };
        let text = edge.describe();
        assert!(text.contains("HAS_DIAGNOSIS"));
        assert!(text.contains("P1_9040"));
    }

    // ── Policies ─────────────────────────────────────────────────────────────

    #[test]
    fn policies_use_kebab_case_names() {
        let mode: IngestionMode = serde_json::from_str("\"merge-visits\"").unwrap();
        assert_eq!(mode, IngestionMode::MergeVisits);
        let policy: UnknownCodePolicy = serde_json::from_str("\"label-unknown\"").unwrap();
        assert_eq!(policy, UnknownCodePolicy::LabelUnknown);
        assert_eq!(IngestionMode::default(), IngestionMode::Rebuild);
        assert_eq!(UnknownCodePolicy::default(), UnknownCodePolicy::Drop);
    }

    // ── Reports ──────────────────────────────────────────────────────────────

    #[test]
    fn run_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..50).map(|_| RunId::new().to_string()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn parse_tally_absorb_sums_counters() {
        let mut total = ParseTally { rows_read: 2, rows_skipped: 1, visits_skipped: 0, codes_dropped: 3 };
        total.absorb(&ParseTally { rows_read: 5, rows_skipped: 0, visits_skipped: 2, codes_dropped: 1 });
        assert_eq!(total, ParseTally { rows_read: 7, rows_skipped: 1, visits_skipped: 2, codes_dropped: 4 });
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    #[test]
    fn error_record_parse_display() {
        let err = TrajectoryError::RecordParse {
            line: 12,
            reason: "unterminated list".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 12"));
        assert!(msg.contains("unterminated list"));
    }

    #[test]
    fn error_reference_data_display() {
        let err = TrajectoryError::ReferenceData {
            reason: "missing column 'NAME'".to_string(),
        };
        assert!(err.to_string().contains("malformed reference data"));
    }

    #[test]
    fn only_transient_store_errors_are_retryable() {
        assert!(TrajectoryError::StoreUnavailable { reason: "down".into() }.is_retryable());
        assert!(TrajectoryError::StoreTimeout { operation: "clear".into(), timeout_ms: 10 }.is_retryable());
        assert!(!TrajectoryError::StoreWrite { element: "x".into(), reason: "constraint".into() }.is_retryable());
        assert!(!TrajectoryError::ConfigError { reason: "bad".into() }.is_retryable());
    }

    #[test]
    fn answer_failure_messages_name_the_mention() {
        let msg = AnswerFailure::NoComplicationsWithin { mention: "diabetes".into(), years: 2 }.to_string();
        assert!(msg.contains("diabetes"));
        assert!(msg.contains("2 years"));
        let msg = AnswerFailure::DiagnosisNotFound { mention: "flu".into() }.to_string();
        assert!(msg.contains("'flu'"));
    }
}

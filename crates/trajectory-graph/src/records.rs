//! Domain values → store records.
//!
//! `PROGRESSES_TO` statistics are flattened into scalar properties, one set
//! per prefix (`overall`, then each stratum name). Statistics that are not
//! defined for the sample size are left out, never written as zero.

use trajectory_contracts::{
    diagnosis::{DiagnosisCode, PatientRecord, Stratum},
    graph::{
        stat, stat_property, Discriminator, EdgeRecord, NodeKey, NodeRecord, Properties, PropertyValue,
        HAS_DIAGNOSIS, OVERALL_PREFIX, PROGRESSES_TO, VISIT_IDENTIFIER,
    },
    trajectory::{IntervalStats, ProgressionEdge},
};

/// Properties of a `Patient` node besides its `id` key.
pub const SEX_PROPERTY: &str = "sex";
pub const STRATUM_PROPERTY: &str = "stratum";
/// Property of `HAS_DIAGNOSIS` edges holding the decoded age.
pub const AGE_PROPERTY: &str = "age";

pub fn diagnosis_node(code: &DiagnosisCode, name: &str) -> NodeRecord {
    let mut properties = Properties::new();
    properties.insert("name".to_string(), name.into());
    NodeRecord {
        key: NodeKey::diagnosis(code.as_str()),
        properties,
    }
}

/// One `PROGRESSES_TO` edge carrying overall and per-stratum statistics.
pub fn progression_edge(edge: &ProgressionEdge) -> EdgeRecord {
    let mut properties = Properties::new();
    put_stats(&mut properties, OVERALL_PREFIX, &edge.overall);
    for (stratum, stratum_stats) in &edge.strata {
        let prefix = stratum.as_str();
        put_stats(&mut properties, prefix, &stratum_stats.stats);
        properties.insert(
            stat_property(prefix, stat::INTERVALS),
            stratum_stats.intervals.clone().into(),
        );
    }

    EdgeRecord {
        label: PROGRESSES_TO.to_string(),
        from: NodeKey::diagnosis(edge.from.as_str()),
        to: NodeKey::diagnosis(edge.to.as_str()),
        discriminator: None,
        properties,
    }
}

fn put_stats(properties: &mut Properties, prefix: &str, stats: &IntervalStats) {
    let mut put = |name: &str, value: PropertyValue| {
        properties.insert(stat_property(prefix, name), value);
    };
    put(stat::FREQUENCY, stats.count.into());
    put(stat::MIN_YEARS, stats.min.into());
    put(stat::MAX_YEARS, stats.max.into());
    put(stat::AVG_YEARS, stats.mean.into());
    put(stat::MEDIAN_YEARS, stats.median.into());
    if let Some(std_dev) = stats.std_dev {
        put(stat::STD_YEARS, std_dev.into());
    }
    if let Some(q1) = stats.q1 {
        put(stat::Q1_YEARS, q1.into());
    }
    if let Some(q3) = stats.q3 {
        put(stat::Q3_YEARS, q3.into());
    }
}

/// `Patient {id}` with the raw stratum text as `sex` and the normalized
/// stratum name. Text that normalizes to the unknown stratum (missing, `NA`,
/// anything unrecognized) is written as `Null`, which clears it.
pub fn patient_node(record: &PatientRecord) -> NodeRecord {
    let sex = match (&record.stratum, record.raw_stratum.as_deref()) {
        (Stratum::Known(_), Some(raw)) => PropertyValue::from(raw),
        _ => PropertyValue::Null,
    };
    let mut properties = Properties::new();
    properties.insert(SEX_PROPERTY.to_string(), sex);
    properties.insert(STRATUM_PROPERTY.to_string(), record.stratum.as_str().into());
    NodeRecord {
        key: NodeKey::patient(record.id.as_str()),
        properties,
    }
}

/// One `HAS_DIAGNOSIS` edge per (visit, code), discriminated by the visit
/// identifier so repeated runs merge instead of duplicating.
pub fn visit_edges(record: &PatientRecord) -> Vec<EdgeRecord> {
    record
        .visits
        .iter()
        .flat_map(|visit| {
            let identifier = visit.identifier(&record.id);
            visit.codes.iter().map(move |code| {
                let mut properties = Properties::new();
                properties.insert(AGE_PROPERTY.to_string(), visit.age.into());
                EdgeRecord {
                    label: HAS_DIAGNOSIS.to_string(),
                    from: NodeKey::patient(record.id.as_str()),
                    to: NodeKey::diagnosis(code.as_str()),
                    discriminator: Some(Discriminator {
                        field: VISIT_IDENTIFIER.to_string(),
                        value: identifier.clone(),
                    }),
                    properties,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use trajectory_contracts::{
        diagnosis::ParsedVisit,
        trajectory::StratumStats,
    };
    use trajectory_core::stats;

    use super::*;

    fn edge(strata: &[(Stratum, &[u32])]) -> ProgressionEdge {
        let all: Vec<u32> = strata.iter().flat_map(|(_, v)| v.iter().copied()).collect();
        let strata: BTreeMap<_, _> = strata
            .iter()
            .map(|(s, v)| {
                let mut intervals = v.to_vec();
                intervals.sort_unstable();
                let stats = stats::compute(&intervals).unwrap();
                (s.clone(), StratumStats { stats, intervals })
            })
            .collect();
        ProgressionEdge {
            from: DiagnosisCode::new("A"),
            to: DiagnosisCode::new("B"),
            overall: stats::compute(&all).unwrap(),
            strata,
        }
    }

    #[test]
    fn progression_properties_are_flattened_per_prefix() {
        let record = progression_edge(&edge(&[
            (Stratum::Known("male".into()), &[1, 2, 3]),
            (Stratum::Unknown, &[10]),
        ]));
        let p = &record.properties;

        assert_eq!(record.label, PROGRESSES_TO);
        assert_eq!(p["overall_frequency"], PropertyValue::Int(4));
        assert_eq!(p["overall_min_years"], PropertyValue::Int(1));
        assert_eq!(p["overall_max_years"], PropertyValue::Int(10));
        assert_eq!(p["overall_avg_years"], PropertyValue::Float(4.0));
        assert_eq!(p["overall_median_years"], PropertyValue::Float(2.5));
        assert_eq!(p["overall_q1_years"], PropertyValue::Float(1.25));
        assert_eq!(p["male_frequency"], PropertyValue::Int(3));
        assert_eq!(p["male_intervals"], PropertyValue::from(vec![1u32, 2, 3]));
        assert_eq!(p["unknown_frequency"], PropertyValue::Int(1));
    }

    #[test]
    fn undefined_statistics_are_not_written() {
        let record = progression_edge(&edge(&[(Stratum::Unknown, &[7])]));
        let p = &record.properties;
        assert!(!p.contains_key("overall_std_years"));
        assert!(!p.contains_key("overall_q1_years"));
        assert!(!p.contains_key("overall_q3_years"));
        assert!(!p.contains_key("unknown_std_years"));
        assert_eq!(p["unknown_median_years"], PropertyValue::Float(7.0));
    }

    fn patient() -> PatientRecord {
        PatientRecord {
            id: "P1".to_string(),
            stratum: Stratum::Unknown,
            raw_stratum: None,
            visits: vec![
                ParsedVisit {
                    age_code: "9040".to_string(),
                    age: 40,
                    codes: vec![DiagnosisCode::new("A")],
                },
                ParsedVisit {
                    age_code: "9045".to_string(),
                    age: 45,
                    codes: vec![DiagnosisCode::new("B"), DiagnosisCode::new("C")],
                },
            ],
            events: Vec::new(),
        }
    }

    #[test]
    fn visit_edges_are_discriminated_by_visit_identifier() {
        let edges = visit_edges(&patient());
        assert_eq!(edges.len(), 3);

        let ids: Vec<&str> = edges
            .iter()
            .filter_map(|e| e.discriminator.as_ref())
            .map(|d| d.value.as_str())
            .collect();
        assert_eq!(ids, vec!["P1_9040", "P1_9045", "P1_9045"]);
        assert_eq!(edges[2].to, NodeKey::diagnosis("C"));
        assert_eq!(edges[2].properties[AGE_PROPERTY], PropertyValue::Int(45));
    }

    #[test]
    fn missing_sex_is_written_as_null() {
        let node = patient_node(&patient());
        assert_eq!(node.key, NodeKey::patient("P1"));
        assert_eq!(node.properties[SEX_PROPERTY], PropertyValue::Null);
        assert_eq!(node.properties[STRATUM_PROPERTY], PropertyValue::from("unknown"));
    }

    #[test]
    fn unrecognized_sex_is_written_as_null() {
        let mut record = patient();
        record.raw_stratum = Some("NA".to_string());
        let node = patient_node(&record);
        assert_eq!(node.properties[SEX_PROPERTY], PropertyValue::Null);

        record.raw_stratum = Some("M".to_string());
        record.stratum = Stratum::Known("male".into());
        let node = patient_node(&record);
        assert_eq!(node.properties[SEX_PROPERTY], PropertyValue::from("M"));
        assert_eq!(node.properties[STRATUM_PROPERTY], PropertyValue::from("male"));
    }
}

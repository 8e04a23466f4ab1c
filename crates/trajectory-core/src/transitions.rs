//! Transition extractor: consecutive diagnosis pairs from a sorted history.

use trajectory_contracts::{
    diagnosis::{PatientRecord, Stratum, VisitEvent},
    trajectory::TransitionTuple,
};

/// Emit one tuple per adjacent pair of `events`.
///
/// `events` must already be sorted by age, so every interval is
/// non-negative. Self-transitions and zero-year intervals are kept. Yields
/// `max(0, events.len() - 1)` tuples.
pub fn extract<'a>(
    events: &'a [VisitEvent],
    stratum: &'a Stratum,
) -> impl Iterator<Item = TransitionTuple> + 'a {
    events.windows(2).map(move |pair| TransitionTuple {
        from: pair[0].code.clone(),
        to: pair[1].code.clone(),
        interval: pair[1].age.saturating_sub(pair[0].age),
        stratum: stratum.clone(),
    })
}

/// All transitions for one parsed patient.
pub fn extract_patient(record: &PatientRecord) -> Vec<TransitionTuple> {
    extract(&record.events, &record.stratum).collect()
}

#[cfg(test)]
mod tests {
    use trajectory_contracts::diagnosis::DiagnosisCode;

    use super::*;

    fn events(items: &[(u32, &str)]) -> Vec<VisitEvent> {
        items
            .iter()
            .map(|(age, code)| VisitEvent {
                age: *age,
                code: DiagnosisCode::new(*code),
            })
            .collect()
    }

    fn pairs(tuples: &[TransitionTuple]) -> Vec<(&str, &str, u32)> {
        tuples
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str(), t.interval))
            .collect()
    }

    #[test]
    fn consecutive_pairs_with_intervals() {
        let evs = events(&[(40, "A"), (45, "B"), (45, "C")]);
        let tuples: Vec<_> = extract(&evs, &Stratum::Known("male".into())).collect();

        assert_eq!(pairs(&tuples), vec![("A", "B", 5), ("B", "C", 0)]);
        assert!(tuples.iter().all(|t| t.stratum == Stratum::Known("male".into())));
    }

    #[test]
    fn self_transitions_are_emitted() {
        let evs = events(&[(50, "A"), (52, "A")]);
        let tuples: Vec<_> = extract(&evs, &Stratum::Unknown).collect();
        assert_eq!(pairs(&tuples), vec![("A", "A", 2)]);
    }

    #[test]
    fn tuple_count_is_events_minus_one() {
        for n in 0..6u32 {
            let evs: Vec<VisitEvent> = (0..n)
                .map(|i| VisitEvent {
                    age: 30 + i,
                    code: DiagnosisCode::new(format!("C{i}")),
                })
                .collect();
            let count = extract(&evs, &Stratum::Unknown).count();
            assert_eq!(count, n.saturating_sub(1) as usize, "n = {n}");
        }
    }
}

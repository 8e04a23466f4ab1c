//! Diagnosis, visit and patient types.
//!
//! These are the values the parser produces from raw patient rows. Patients
//! are transient: the trajectory pipeline only uses them to derive
//! transitions, while the per-visit pipeline persists them as nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque diagnosis code, globally unique (e.g. "E11" or "BPS_0042").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagnosisCode(pub String);

impl DiagnosisCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagnosisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A diagnosis as persisted in the graph: its code and human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisNode {
    pub code: DiagnosisCode,
    pub name: String,
}

/// One diagnosis recorded at a given age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    /// Age in whole years at the visit.
    pub age: u32,
    pub code: DiagnosisCode,
}

/// The categorical partition a patient's transitions are counted under.
///
/// `Unknown` is the sentinel for missing or unrecognized values. It is a
/// distinct variant so it can never merge with a configured category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stratum {
    Known(String),
    Unknown,
}

impl Stratum {
    /// The sentinel's name, used as a property prefix in the graph.
    pub const UNKNOWN_NAME: &'static str = "unknown";

    /// Name used as a property prefix (`male_frequency`, `unknown_min_years`).
    pub fn as_str(&self) -> &str {
        match self {
            Stratum::Known(name) => name,
            Stratum::Unknown => Self::UNKNOWN_NAME,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Stratum::Unknown)
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One visit after decoding: the raw age-code is kept because the per-visit
/// graph uses it to build the visit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedVisit {
    pub age_code: String,
    pub age: u32,
    /// Codes that survived the unknown-code policy, in input order.
    pub codes: Vec<DiagnosisCode>,
}

impl ParsedVisit {
    /// Identifier of this visit within the patient's history: `{patient}_{age_code}`.
    pub fn identifier(&self, patient_id: &str) -> String {
        format!("{}_{}", patient_id, self.age_code)
    }
}

/// A patient row after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub stratum: Stratum,
    /// The stratum text exactly as it appeared in the input, if any.
    pub raw_stratum: Option<String>,
    /// Decoded visits in input order.
    pub visits: Vec<ParsedVisit>,
    /// All events sorted by age; ties keep input order.
    pub events: Vec<VisitEvent>,
}

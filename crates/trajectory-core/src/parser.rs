//! Visit sequence parser.
//!
//! Turns one raw patient row into a `PatientRecord`: decoded visits plus a
//! single age-ordered event list. Problems are local:
//!
//! - malformed visit list → the row is rejected with `RecordParse`
//! - visit with fewer than two elements → that visit is skipped
//! - undecodable age-code → that visit is skipped (`AgeDecode`)
//! - code missing from the dictionary → handled by `UnknownCodePolicy`
//!
//! `PatientRowReader` yields raw rows from a delimited patient file.

use std::{fs::File, io, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use trajectory_contracts::{
    diagnosis::{DiagnosisCode, ParsedVisit, PatientRecord, VisitEvent},
    error::{TrajectoryError, TrajectoryResult},
    policy::UnknownCodePolicy,
};

use crate::{
    dictionary::CodeDictionary,
    literal::{parse_list, Literal},
    strata::StratumScheme,
};

// ── Raw rows ──────────────────────────────────────────────────────────────────

/// One patient row before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPatientRow {
    /// 1-based line number in the source file, for diagnostics.
    pub line: u64,
    pub id: String,
    pub stratum: Option<String>,
    /// Serialized nested list of visits.
    pub visits: String,
}

/// Header names of the patient file's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientColumns {
    pub id: String,
    pub stratum: String,
    pub visits: String,
}

impl Default for PatientColumns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            stratum: "sex".to_string(),
            visits: "visits".to_string(),
        }
    }
}

/// Streams `RawPatientRow`s from a delimited file with a header row.
///
/// Rows with missing columns come out as `Err(RecordParse)` so the caller can
/// log and continue.
pub struct PatientRowReader<R: io::Read> {
    records: csv::StringRecordsIntoIter<R>,
    id_idx: usize,
    stratum_idx: usize,
    visits_idx: usize,
}

impl PatientRowReader<File> {
    pub fn open(path: &Path, columns: &PatientColumns) -> TrajectoryResult<Self> {
        let file = File::open(path).map_err(|e| TrajectoryError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_reader(file, columns)
    }
}

impl<R: io::Read> PatientRowReader<R> {
    /// Read the header and locate the configured columns.
    ///
    /// A header without one of the columns is a `RecordParse` error at line 1:
    /// no row in the file could be parsed.
    pub fn from_reader(reader: R, columns: &PatientColumns) -> TrajectoryResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| TrajectoryError::RecordParse {
                line: 1,
                reason: format!("cannot read header: {}", e),
            })?
            .clone();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TrajectoryError::RecordParse {
                    line: 1,
                    reason: format!("header has no '{}' column", name),
                })
        };
        let id_idx = find(&columns.id)?;
        let stratum_idx = find(&columns.stratum)?;
        let visits_idx = find(&columns.visits)?;

        Ok(Self {
            records: rdr.into_records(),
            id_idx,
            stratum_idx,
            visits_idx,
        })
    }
}

impl<R: io::Read> Iterator for PatientRowReader<R> {
    type Item = TrajectoryResult<RawPatientRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                return Some(Err(TrajectoryError::RecordParse {
                    line,
                    reason: e.to_string(),
                }));
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let (Some(id), Some(stratum), Some(visits)) = (
            record.get(self.id_idx),
            record.get(self.stratum_idx),
            record.get(self.visits_idx),
        ) else {
            return Some(Err(TrajectoryError::RecordParse {
                line,
                reason: format!("not enough columns ({} found)", record.len()),
            }));
        };

        Some(Ok(RawPatientRow {
            line,
            id: id.to_string(),
            stratum: Some(stratum.to_string()).filter(|s| !s.is_empty()),
            visits: visits.to_string(),
        }))
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Per-row counters of what was skipped while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseDiagnostics {
    pub visits_skipped: u64,
    pub codes_dropped: u64,
}

/// A parsed row and what had to be skipped to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPatient {
    pub record: PatientRecord,
    pub diagnostics: ParseDiagnostics,
}

/// Decode an age-code by stripping its single-character prefix: "9070" → 70.
pub fn decode_age(age_code: &str) -> TrajectoryResult<u32> {
    let mut chars = age_code.chars();
    if chars.next().is_none() {
        return Err(TrajectoryError::AgeDecode {
            age_code: age_code.to_string(),
            reason: "empty age code".to_string(),
        });
    }
    let rest = chars.as_str();
    rest.parse::<u32>().map_err(|e| TrajectoryError::AgeDecode {
        age_code: age_code.to_string(),
        reason: format!("'{}' is not a whole number of years: {}", rest, e),
    })
}

/// Parses raw rows against a code dictionary and stratum scheme.
pub struct VisitParser<'a> {
    dictionary: &'a CodeDictionary,
    strata: &'a StratumScheme,
    unknown_codes: UnknownCodePolicy,
}

impl<'a> VisitParser<'a> {
    pub fn new(
        dictionary: &'a CodeDictionary,
        strata: &'a StratumScheme,
        unknown_codes: UnknownCodePolicy,
    ) -> Self {
        Self {
            dictionary,
            strata,
            unknown_codes,
        }
    }

    /// Parse one row.
    ///
    /// Returns `Err(RecordParse)` only when the whole row is unusable;
    /// visit-level problems are logged and counted in the diagnostics.
    pub fn parse(&self, row: &RawPatientRow) -> TrajectoryResult<ParsedPatient> {
        let visits = parse_list(row.visits.trim()).map_err(|reason| TrajectoryError::RecordParse {
            line: row.line,
            reason: format!("patient '{}': malformed visit list: {}", row.id, reason),
        })?;

        let mut diagnostics = ParseDiagnostics::default();
        let mut parsed_visits = Vec::with_capacity(visits.len());

        for visit in &visits {
            match self.parse_visit(row, visit, &mut diagnostics) {
                Some(v) => parsed_visits.push(v),
                None => diagnostics.visits_skipped += 1,
            }
        }

        let mut events: Vec<VisitEvent> = parsed_visits
            .iter()
            .flat_map(|v| {
                v.codes.iter().map(move |code| VisitEvent {
                    age: v.age,
                    code: code.clone(),
                })
            })
            .collect();
        // Stable: same-age events keep input order.
        events.sort_by_key(|e| e.age);

        let stratum = self.strata.normalize(row.stratum.as_deref());

        Ok(ParsedPatient {
            record: PatientRecord {
                id: row.id.clone(),
                stratum,
                raw_stratum: row.stratum.clone(),
                visits: parsed_visits,
                events,
            },
            diagnostics,
        })
    }

    fn parse_visit(
        &self,
        row: &RawPatientRow,
        visit: &Literal,
        diagnostics: &mut ParseDiagnostics,
    ) -> Option<ParsedVisit> {
        let items = match visit.as_list() {
            Some(items) if items.len() >= 2 => items,
            _ => {
                debug!(line = row.line, patient = %row.id, "skipping visit without age or diagnoses");
                return None;
            }
        };

        let age_code = items[0].as_text().unwrap_or_default();
        let age = match decode_age(age_code) {
            Ok(age) => age,
            Err(e) => {
                warn!(line = row.line, patient = %row.id, error = %e, "skipping visit");
                return None;
            }
        };

        let mut codes = Vec::with_capacity(items.len() - 1);
        for item in &items[1..] {
            let Some(raw) = item.as_text().map(str::trim).filter(|c| !c.is_empty()) else {
                warn!(line = row.line, patient = %row.id, "dropping non-text diagnosis entry");
                diagnostics.codes_dropped += 1;
                continue;
            };
            let code = DiagnosisCode::new(raw);
            if !self.dictionary.contains(&code) {
                match self.unknown_codes {
                    UnknownCodePolicy::Drop => {
                        let err = TrajectoryError::UnknownDiagnosisCode { code: raw.to_string() };
                        debug!(line = row.line, patient = %row.id, error = %err, "dropping code");
                        diagnostics.codes_dropped += 1;
                        continue;
                    }
                    UnknownCodePolicy::LabelUnknown => {
                        debug!(line = row.line, patient = %row.id, code = raw, "keeping unknown code");
                    }
                }
            }
            codes.push(code);
        }

        Some(ParsedVisit {
            age_code: age_code.to_string(),
            age,
            codes,
        })
    }
}

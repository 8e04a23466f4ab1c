//! Code dictionary: diagnosis code → human-readable name.
//!
//! Loaded once per run from a delimited reference table. Missing required
//! columns are fatal (`ReferenceData`); individual bad rows are skipped.

use std::{collections::BTreeMap, fs::File, io, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use trajectory_contracts::{
    diagnosis::DiagnosisCode,
    error::{TrajectoryError, TrajectoryResult},
};

/// Header names of the reference table's code and name columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceColumns {
    pub code: String,
    pub name: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            code: "CODE".to_string(),
            name: "NAME".to_string(),
        }
    }
}

/// Mapping from diagnosis code to name. Duplicate codes: last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeDictionary {
    names: BTreeMap<DiagnosisCode, String>,
}

impl CodeDictionary {
    /// Build a dictionary from `(code, name)` pairs.
    pub fn from_pairs<I, C, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        let names = pairs
            .into_iter()
            .map(|(c, n)| (DiagnosisCode::new(c), n.into()))
            .collect();
        Self { names }
    }

    /// Read the reference table at `path`.
    pub fn load_from_path(path: &Path, columns: &ReferenceColumns) -> TrajectoryResult<Self> {
        let file = File::open(path).map_err(|e| TrajectoryError::ReferenceData {
            reason: format!("cannot open reference table '{}': {}", path.display(), e),
        })?;
        let dictionary = Self::load_from_reader(file, columns)?;
        info!(
            path = %path.display(),
            codes = dictionary.len(),
            "code dictionary loaded"
        );
        Ok(dictionary)
    }

    /// Read a reference table from any reader. The first row must be a header.
    pub fn load_from_reader<R: io::Read>(reader: R, columns: &ReferenceColumns) -> TrajectoryResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| TrajectoryError::ReferenceData {
            reason: format!("cannot read reference table header: {}", e),
        })?;
        let code_idx = column_index(headers, &columns.code)?;
        let name_idx = column_index(headers, &columns.name)?;

        let mut names = BTreeMap::new();
        for (idx, record) in rdr.records().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(line, error = %e, "skipping unreadable reference row");
                    continue;
                }
            };
            let (Some(code), Some(name)) = (record.get(code_idx), record.get(name_idx)) else {
                warn!(line, "skipping reference row with missing columns");
                continue;
            };
            if code.is_empty() {
                warn!(line, "skipping reference row with empty code");
                continue;
            }
            if let Some(previous) = names.insert(DiagnosisCode::new(code), name.to_string()) {
                debug!(line, code, previous = %previous, "duplicate code, keeping the later name");
            }
        }

        Ok(Self { names })
    }

    pub fn name_of(&self, code: &DiagnosisCode) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &DiagnosisCode) -> bool {
        self.names.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All entries, ordered by code.
    pub fn iter(&self) -> impl Iterator<Item = (&DiagnosisCode, &str)> {
        self.names.iter().map(|(c, n)| (c, n.as_str()))
    }
}

fn column_index(headers: &csv::StringRecord, column: &str) -> TrajectoryResult<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| TrajectoryError::ReferenceData {
            reason: format!(
                "required column '{}' not found (columns: {})",
                column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str) -> TrajectoryResult<CodeDictionary> {
        CodeDictionary::load_from_reader(text.as_bytes(), &ReferenceColumns::default())
    }

    #[test]
    fn loads_code_name_pairs() {
        let dict = load("CODE,NAME\nA,Diabetes\nB,Retinopathy\n").unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.name_of(&DiagnosisCode::new("A")), Some("Diabetes"));
        assert!(dict.contains(&DiagnosisCode::new("B")));
        assert!(!dict.contains(&DiagnosisCode::new("C")));
    }

    #[test]
    fn duplicate_codes_keep_the_last_name() {
        let dict = load("CODE,NAME\nA,Old name\nA,New name\n").unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.name_of(&DiagnosisCode::new("A")), Some("New name"));
    }

    #[test]
    fn extra_columns_and_column_order_are_irrelevant() {
        let dict = load("NAME,GROUP,CODE\n\"Heart failure, chronic\",cardio,I50\n").unwrap();
        assert_eq!(dict.name_of(&DiagnosisCode::new("I50")), Some("Heart failure, chronic"));
    }

    #[test]
    fn missing_name_column_is_reference_data_error() {
        match load("CODE,LABEL\nA,Diabetes\n") {
            Err(TrajectoryError::ReferenceData { reason }) => {
                assert!(reason.contains("'NAME'"), "unexpected reason: {reason}");
            }
            other => panic!("expected ReferenceData, got {:?}", other),
        }
    }

    #[test]
    fn custom_column_names() {
        let columns = ReferenceColumns {
            code: "CODE_BPS".to_string(),
            name: "BPS_PATHOLOGY".to_string(),
        };
        let dict = CodeDictionary::load_from_reader(
            "CODE_BPS,BPS_PATHOLOGY\nX1,Asthma\n".as_bytes(),
            &columns,
        )
        .unwrap();
        assert_eq!(dict.name_of(&DiagnosisCode::new("X1")), Some("Asthma"));
    }

    #[test]
    fn short_and_empty_rows_are_skipped() {
        let dict = load("CODE,NAME\nA\n,Nameless\nB,Kept\n").unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.contains(&DiagnosisCode::new("B")));
    }

    #[test]
    fn missing_file_is_reference_data_error() {
        let result = CodeDictionary::load_from_path(
            Path::new("/definitely/not/here.csv"),
            &ReferenceColumns::default(),
        );
        assert!(matches!(result, Err(TrajectoryError::ReferenceData { .. })));
    }
}

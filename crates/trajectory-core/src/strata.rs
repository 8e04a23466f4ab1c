//! Stratum normalization.
//!
//! Raw stratum text (e.g. a sex column holding "M", "F", "NA") is mapped onto
//! a small closed set of configured categories. Anything else becomes
//! `Stratum::Unknown`.

use serde::{Deserialize, Serialize};

use trajectory_contracts::diagnosis::Stratum;

/// One recognized category and the raw spellings that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratumCategory {
    /// Canonical name, also used as a graph property prefix.
    pub name: String,
    /// Raw values accepted for this category, compared case-insensitively.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl StratumCategory {
    pub fn new(name: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn accepts(&self, raw: &str) -> bool {
        self.name.eq_ignore_ascii_case(raw) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(raw))
    }
}

/// The configured category set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratumScheme {
    categories: Vec<StratumCategory>,
}

impl StratumScheme {
    pub fn new(categories: Vec<StratumCategory>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[StratumCategory] {
        &self.categories
    }

    /// Map raw text to a stratum. The first category that accepts it wins.
    pub fn normalize(&self, raw: Option<&str>) -> Stratum {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Stratum::Unknown;
        };
        self.categories
            .iter()
            .find(|c| c.accepts(raw))
            .map(|c| Stratum::Known(c.name.clone()))
            .unwrap_or(Stratum::Unknown)
    }
}

impl Default for StratumScheme {
    /// Sex as recorded in the source registries: "M"/"F", or "1"/"2".
    fn default() -> Self {
        Self::new(vec![
            StratumCategory::new("male", &["M", "1"]),
            StratumCategory::new("female", &["F", "2"]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_match_case_insensitively() {
        let scheme = StratumScheme::default();
        assert_eq!(scheme.normalize(Some("m")), Stratum::Known("male".into()));
        assert_eq!(scheme.normalize(Some(" F ")), Stratum::Known("female".into()));
        assert_eq!(scheme.normalize(Some("Female")), Stratum::Known("female".into()));
        assert_eq!(scheme.normalize(Some("2")), Stratum::Known("female".into()));
    }

    #[test]
    fn missing_and_unrecognized_values_are_unknown() {
        let scheme = StratumScheme::default();
        assert_eq!(scheme.normalize(None), Stratum::Unknown);
        assert_eq!(scheme.normalize(Some("")), Stratum::Unknown);
        assert_eq!(scheme.normalize(Some("NA")), Stratum::Unknown);
        assert_eq!(scheme.normalize(Some("unknown")), Stratum::Unknown);
    }
}

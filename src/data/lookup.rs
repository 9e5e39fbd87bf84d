//! Going and race-type lookup tables
//!
//! The tables are versioned static data (`data/lookup_tables.json`), embedded
//! at compile time and parsed once on first use. A replacement file can be
//! loaded with [`LookupTables::from_path`].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::PipelineError;
use crate::models::{GoingBin, RaceTypeBin};

const BUILTIN_TABLES_JSON: &str = include_str!("../../data/lookup_tables.json");

static BUILTIN_TABLES: Lazy<LookupTables> = Lazy::new(|| {
    LookupTables::from_json(BUILTIN_TABLES_JSON).expect("embedded lookup tables are valid")
});

/// Raw code to bucket tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTables {
    pub version: String,
    pub going: HashMap<String, GoingBin>,
    pub race_type: HashMap<String, RaceTypeBin>,
}

impl LookupTables {
    /// Tables shipped with the crate
    pub fn builtin() -> &'static LookupTables {
        &BUILTIN_TABLES
    }

    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let tables: Self =
            serde_json::from_str(text).map_err(|e| PipelineError::LookupTable(e.to_string()))?;
        if tables.going.is_empty() || tables.race_type.is_empty() {
            return Err(PipelineError::LookupTable(format!(
                "version {} has an empty table",
                tables.version
            )));
        }
        Ok(tables)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Exact, case-sensitive going lookup
    pub fn going_bin(&self, code: &str) -> Option<GoingBin> {
        self.going.get(code).copied()
    }

    /// Exact, case-sensitive race-type lookup
    pub fn race_type_bin(&self, label: &str) -> Option<RaceTypeBin> {
        self.race_type.get(label).copied()
    }

    /// Going table sorted by code, for display
    pub fn sorted_going(&self) -> Vec<(&str, GoingBin)> {
        let mut entries: Vec<_> = self.going.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Race-type table sorted by label, for display
    pub fn sorted_race_type(&self) -> Vec<(&str, RaceTypeBin)> {
        let mut entries: Vec<_> = self
            .race_type
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Codes that were present in the data but absent from a table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnmappedCodes {
    pub going: BTreeMap<String, usize>,
    pub race_type: BTreeMap<String, usize>,
}

impl UnmappedCodes {
    pub fn record_going(&mut self, code: &str) {
        *self.going.entry(code.to_string()).or_default() += 1;
    }

    pub fn record_race_type(&mut self, label: &str) {
        *self.race_type.entry(label.to_string()).or_default() += 1;
    }

    pub fn going_rows(&self) -> usize {
        self.going.values().sum()
    }

    pub fn race_type_rows(&self) -> usize {
        self.race_type.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.going.is_empty() && self.race_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_load() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.going.len(), 24);
        assert_eq!(tables.race_type.len(), 26);
    }

    #[test]
    fn test_going_buckets() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.going_bin("FRM"), Some(GoingBin::Fast));
        assert_eq!(tables.going_bin("GTS"), Some(GoingBin::Good));
        assert_eq!(tables.going_bin("YLD"), Some(GoingBin::Soft));
        assert_eq!(tables.going_bin("YSH"), Some(GoingBin::Heavy));
        assert_eq!(tables.going_bin("STHE"), Some(GoingBin::Slow));
        assert_eq!(tables.going_bin("STD"), Some(GoingBin::Standard));
    }

    #[test]
    fn test_race_type_buckets() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.race_type_bin("Novice Stakes"), Some(RaceTypeBin::Maiden));
        assert_eq!(tables.race_type_bin("Nursery"), Some(RaceTypeBin::Handicap));
        assert_eq!(tables.race_type_bin("Novice Hcap Chase"), Some(RaceTypeBin::Handicap));
        assert_eq!(tables.race_type_bin("Novice Chase"), Some(RaceTypeBin::Novice));
        assert_eq!(tables.race_type_bin("Group 2"), Some(RaceTypeBin::Group));
        assert_eq!(tables.race_type_bin("NH Flat"), Some(RaceTypeBin::NhFlat));
        assert_eq!(tables.race_type_bin("Hunters Chase"), Some(RaceTypeBin::Hunters));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.going_bin("gd"), None);
        assert_eq!(tables.going_bin(" GD"), None);
        assert_eq!(tables.race_type_bin("maiden"), None);
        assert_eq!(tables.race_type_bin("Group 4"), None);
    }

    #[test]
    fn test_from_json_rejects_bad_bucket() {
        let json = r#"{"version": "x", "going": {"GD": "damp"}, "race_type": {"Maiden": "maiden"}}"#;
        assert!(matches!(
            LookupTables::from_json(json),
            Err(PipelineError::LookupTable(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_empty_table() {
        let json = r#"{"version": "x", "going": {}, "race_type": {"Maiden": "maiden"}}"#;
        assert!(LookupTables::from_json(json).is_err());
    }

    #[test]
    fn test_unmapped_codes() {
        let mut unmapped = UnmappedCodes::default();
        assert!(unmapped.is_empty());
        unmapped.record_going("XYZ");
        unmapped.record_going("XYZ");
        unmapped.record_race_type("Bumper");
        assert_eq!(unmapped.going_rows(), 2);
        assert_eq!(unmapped.race_type_rows(), 1);
        assert_eq!(unmapped.going.get("XYZ"), Some(&2));
    }
}

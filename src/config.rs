//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Default output file name
pub const DEFAULT_OUTPUT_FILE: &str = "preprocessed_before_form.csv";

/// What to do with a data-quality error (bad runner count, zero race average)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataErrorPolicy {
    /// Abort the run with the error
    #[default]
    Fail,
    /// Log, record the issue in the report and leave the affected cells missing
    Flag,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// chrono format of the `Time` column
    pub time_format: String,
    /// chrono formats tried in order for the `Date of Race` column
    pub date_formats: Vec<String>,
    /// Number of equal-frequency distance buckets
    pub distance_bins: usize,
    pub on_data_error: DataErrorPolicy,
    /// Name of the row-index column written first in the output file
    pub index_column: String,
    /// Replacement lookup table file (built-in tables when None)
    pub lookup_tables: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            time_format: "%H:%M:%S".to_string(),
            date_formats: vec!["%Y-%m-%d".to_string(), "%d/%m/%Y".to_string()],
            distance_bins: 5,
            on_data_error: DataErrorPolicy::Fail,
            index_column: "index".to_string(),
            lookup_tables: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; absent fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.distance_bins == 0 {
            return Err(PipelineError::Config(
                "distance_bins must be at least 1".to_string(),
            ));
        }
        if self.date_formats.is_empty() {
            return Err(PipelineError::Config(
                "date_formats must list at least one format".to_string(),
            ));
        }
        if self.time_format.is_empty() {
            return Err(PipelineError::Config("time_format is empty".to_string()));
        }
        Ok(())
    }

    pub fn with_distance_bins(mut self, bins: usize) -> Self {
        self.distance_bins = bins;
        self
    }

    pub fn with_policy(mut self, policy: DataErrorPolicy) -> Self {
        self.on_data_error = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.distance_bins, 5);
        assert_eq!(config.on_data_error, DataErrorPolicy::Fail);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"on_data_error": "flag", "distance_bins": 4}"#).unwrap();
        assert_eq!(config.on_data_error, DataErrorPolicy::Flag);
        assert_eq!(config.distance_bins, 4);
        assert_eq!(config.time_format, "%H:%M:%S");
        assert_eq!(config.index_column, "index");
    }

    #[test]
    fn test_validate_rejects_zero_bins() {
        let config = PipelineConfig::default().with_distance_bins(0);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_date_formats() {
        let config = PipelineConfig {
            date_formats: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{"index_column": "row"}}"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.index_column, "row");
        assert_eq!(config.distance_bins, 5);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            PipelineConfig::load(&path),
            Err(PipelineError::Config(_))
        ));
    }
}

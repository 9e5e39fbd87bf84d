use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input column is absent
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// An input column clashes with a derived output column
    #[error("Input column {0:?} clashes with a derived column; rename it before preprocessing")]
    ReservedColumn(String),

    /// Race identifier could not be built for a row
    #[error("Invalid race identifier at row {row}: bad {field} {value:?}")]
    InvalidRaceId {
        row: usize,
        field: &'static str,
        value: String,
    },

    /// Runner count is missing, non-numeric or not positive
    #[error("Invalid runner count at row {row} (race {rid}): {value:?}")]
    InvalidRunners {
        row: usize,
        rid: String,
        value: String,
    },

    /// Mean race weight is exactly zero, deviation is undefined
    #[error("Race {rid} has a zero average weight")]
    ZeroRaceAverage { rid: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid lookup table: {0}")]
    LookupTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    /// Whether the error describes bad source data that the `flag` policy may
    /// downgrade to a recorded issue
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidRunners { .. } | PipelineError::ZeroRaceAverage { .. }
        )
    }

    /// Short machine-readable code used in run reports
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::MissingColumn(_) => "missing_column",
            PipelineError::ReservedColumn(_) => "reserved_column",
            PipelineError::InvalidRaceId { .. } => "invalid_race_id",
            PipelineError::InvalidRunners { .. } => "invalid_runners",
            PipelineError::ZeroRaceAverage { .. } => "zero_race_average",
            PipelineError::Config(_) => "config",
            PipelineError::LookupTable(_) => "lookup_table",
            PipelineError::Io(_) => "io",
            PipelineError::Polars(_) => "polars",
        }
    }
}

/// A data-quality problem recorded instead of aborting the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataIssue {
    pub code: &'static str,
    pub row: Option<usize>,
    pub message: String,
}

impl DataIssue {
    pub fn from_error(err: &PipelineError, row: Option<usize>) -> Self {
        Self {
            code: err.code(),
            row,
            message: err.to_string(),
        }
    }
}

/// Validate a runner count cell, returning the positive count
pub fn validate_runners(row: usize, rid: &str, raw: Option<&str>) -> Result<u32, PipelineError> {
    let invalid = || PipelineError::InvalidRunners {
        row,
        rid: rid.to_string(),
        value: raw.unwrap_or_default().to_string(),
    };

    let value: f64 = raw
        .map(str::trim)
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)?;

    if !value.is_finite() || value < 1.0 {
        return Err(invalid());
    }

    Ok(value.trunc() as u32)
}

/// Validate a race average weight before it is used as a divisor
pub fn validate_race_average(rid: &str, mean: f64) -> Result<f64, PipelineError> {
    if mean == 0.0 {
        return Err(PipelineError::ZeroRaceAverage {
            rid: rid.to_string(),
        });
    }
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_runners_valid() {
        assert_eq!(validate_runners(0, "r", Some("12")).unwrap(), 12);
        assert_eq!(validate_runners(0, "r", Some(" 8 ")).unwrap(), 8);
        assert_eq!(validate_runners(0, "r", Some("7.0")).unwrap(), 7);
    }

    #[test]
    fn test_validate_runners_invalid() {
        assert!(validate_runners(0, "r", Some("0")).is_err());
        assert!(validate_runners(0, "r", Some("-3")).is_err());
        assert!(validate_runners(0, "r", Some("abc")).is_err());
        assert!(validate_runners(0, "r", Some("")).is_err());
        assert!(validate_runners(0, "r", None).is_err());
    }

    #[test]
    fn test_validate_race_average() {
        assert!(validate_race_average("r", 133.0).is_ok());
        assert!(validate_race_average("r", 0.0).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::InvalidRunners {
            row: 4,
            rid: "20230101Ascot1400".to_string(),
            value: "0".to_string(),
        };
        assert!(err.to_string().contains("row 4"));
        assert!(err.to_string().contains("20230101Ascot1400"));
    }

    #[test]
    fn test_data_quality_classification() {
        assert!(PipelineError::ZeroRaceAverage { rid: "r".into() }.is_data_quality());
        assert!(!PipelineError::MissingColumn("Time".into()).is_data_quality());
        assert!(!PipelineError::InvalidRaceId {
            row: 0,
            field: "time",
            value: String::new(),
        }
        .is_data_quality());
    }

    #[test]
    fn test_data_issue_from_error() {
        let err = PipelineError::ZeroRaceAverage { rid: "r1".into() };
        let issue = DataIssue::from_error(&err, Some(3));
        assert_eq!(issue.code, "zero_race_average");
        assert_eq!(issue.row, Some(3));
        assert!(issue.message.contains("r1"));
    }
}

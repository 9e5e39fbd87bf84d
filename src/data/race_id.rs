//! Race identifier construction
//!
//! `rid` = `YYYYMMDD` + track + `HHMM`. It identifies the race, not the row,
//! so every runner of a race must produce the same key. A row whose key
//! cannot be built is an error: a guessed key would silently merge or split
//! races in the per-race statistics.

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Fallback accepted when the configured time format does not match
const SHORT_TIME_FORMAT: &str = "%H:%M";

/// Builds race identifiers with the configured date and time formats
#[derive(Debug, Clone)]
pub struct RaceIdBuilder {
    date_formats: Vec<String>,
    time_format: String,
}

impl Default for RaceIdBuilder {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RaceIdBuilder {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            date_formats: config.date_formats.clone(),
            time_format: config.time_format.clone(),
        }
    }

    /// Build the identifier for one row
    pub fn build(
        &self,
        row: usize,
        date: Option<&str>,
        track: Option<&str>,
        time: Option<&str>,
    ) -> Result<String, PipelineError> {
        let date = self.parse_date(row, date)?;
        let track = Self::parse_track(row, track)?;
        let time = self.parse_time(row, time)?;

        Ok(format!(
            "{}{}{:02}{:02}",
            date.format("%Y%m%d"),
            track,
            time.hour(),
            time.minute()
        ))
    }

    fn parse_date(&self, row: usize, raw: Option<&str>) -> Result<NaiveDate, PipelineError> {
        let text = raw.map(str::trim).unwrap_or_default();
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            .ok_or_else(|| invalid(row, "date", raw))
    }

    fn parse_track(row: usize, raw: Option<&str>) -> Result<&str, PipelineError> {
        match raw.map(str::trim) {
            Some(track) if !track.is_empty() => Ok(track),
            _ => Err(invalid(row, "track", raw)),
        }
    }

    fn parse_time(&self, row: usize, raw: Option<&str>) -> Result<NaiveTime, PipelineError> {
        let text = raw.map(str::trim).unwrap_or_default();
        NaiveTime::parse_from_str(text, &self.time_format)
            .or_else(|_| NaiveTime::parse_from_str(text, SHORT_TIME_FORMAT))
            .map_err(|_| invalid(row, "time", raw))
    }
}

fn invalid(row: usize, field: &'static str, raw: Option<&str>) -> PipelineError {
    PipelineError::InvalidRaceId {
        row,
        field,
        value: raw.unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rid() {
        let builder = RaceIdBuilder::default();
        let rid = builder
            .build(0, Some("2023-01-05"), Some("Ascot"), Some("14:05:00"))
            .unwrap();
        assert_eq!(rid, "20230105Ascot1405");
    }

    #[test]
    fn test_zero_padding() {
        let builder = RaceIdBuilder::default();
        let rid = builder
            .build(0, Some("2023-03-09"), Some("Kempton"), Some("09:00:00"))
            .unwrap();
        assert_eq!(rid, "20230309Kempton0900");
    }

    #[test]
    fn test_alternate_date_and_short_time() {
        let builder = RaceIdBuilder::default();
        let rid = builder
            .build(0, Some("05/01/2023"), Some(" Ascot "), Some("14:05"))
            .unwrap();
        assert_eq!(rid, "20230105Ascot1405");
    }

    #[test]
    fn test_same_race_same_rid() {
        let builder = RaceIdBuilder::default();
        let a = builder
            .build(0, Some("2023-01-05"), Some("Ascot"), Some("14:05:00"))
            .unwrap();
        let b = builder
            .build(7, Some("2023-01-05"), Some("Ascot"), Some("14:05:30"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_time_fails() {
        let builder = RaceIdBuilder::default();
        for time in [None, Some(""), Some("25:00:00"), Some("noon")] {
            let err = builder
                .build(3, Some("2023-01-05"), Some("Ascot"), time)
                .unwrap_err();
            assert!(matches!(
                err,
                PipelineError::InvalidRaceId {
                    row: 3,
                    field: "time",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_invalid_date_or_track_fails() {
        let builder = RaceIdBuilder::default();
        assert!(matches!(
            builder.build(0, Some("yesterday"), Some("Ascot"), Some("14:05:00")),
            Err(PipelineError::InvalidRaceId { field: "date", .. })
        ));
        assert!(matches!(
            builder.build(0, Some("2023-01-05"), Some("  "), Some("14:05:00")),
            Err(PipelineError::InvalidRaceId { field: "track", .. })
        ));
    }
}

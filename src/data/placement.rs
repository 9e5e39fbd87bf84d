//! Finishing position normalization

use crate::data::parser::parse_place;
use crate::error::{validate_runners, PipelineError};

/// Normalized finishing position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// place / runners in [0, 1]
    pub normalized: f64,
    /// Raw place was non-numeric or missing and scored as last
    pub filled: bool,
    /// Place exceeded the runner count and was clamped to 1
    pub clamped: bool,
}

/// Score a finishing place against the field size
///
/// A non-numeric place (pulled up, fell, ...) counts as last. Places beyond
/// the runner count clamp to exactly 1. An unusable runner count is an error.
pub fn normalize_position(
    row: usize,
    rid: &str,
    place: Option<&str>,
    runners: Option<&str>,
) -> Result<Placement, PipelineError> {
    let runners = validate_runners(row, rid, runners)? as f64;

    let (place, filled) = match parse_place(place) {
        Some(p) => (p.trunc(), false),
        None => (runners, true),
    };

    let ratio = place / runners;
    Ok(Placement {
        normalized: ratio.clamp(0.0, 1.0),
        filled,
        clamped: ratio > 1.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_place() {
        let p = normalize_position(0, "r", Some("2"), Some("8")).unwrap();
        assert!((p.normalized - 0.25).abs() < 1e-12);
        assert!(!p.filled);
        assert!(!p.clamped);
    }

    #[test]
    fn test_winner_and_last() {
        let first = normalize_position(0, "r", Some("1"), Some("10")).unwrap();
        assert!((first.normalized - 0.1).abs() < 1e-12);

        let last = normalize_position(0, "r", Some("10"), Some("10")).unwrap();
        assert_eq!(last.normalized, 1.0);
        assert!(!last.clamped);
    }

    #[test]
    fn test_non_numeric_place_scores_last() {
        let p = normalize_position(0, "r", Some("PU"), Some("12")).unwrap();
        assert_eq!(p.normalized, 1.0);
        assert!(p.filled);

        let p = normalize_position(0, "r", None, Some("5")).unwrap();
        assert_eq!(p.normalized, 1.0);
        assert!(p.filled);
    }

    #[test]
    fn test_place_beyond_runners_clamps() {
        let p = normalize_position(0, "r", Some("14"), Some("12")).unwrap();
        assert_eq!(p.normalized, 1.0);
        assert!(p.clamped);
    }

    #[test]
    fn test_bounds_hold() {
        for place in ["0", "1", "3", "9", "40", "F", "-2"] {
            let p = normalize_position(0, "r", Some(place), Some("9")).unwrap();
            assert!((0.0..=1.0).contains(&p.normalized), "place {}", place);
        }
    }

    #[test]
    fn test_invalid_runners() {
        assert!(matches!(
            normalize_position(5, "r", Some("1"), Some("0")),
            Err(PipelineError::InvalidRunners { row: 5, .. })
        ));
        assert!(normalize_position(5, "r", Some("1"), None).is_err());
    }
}

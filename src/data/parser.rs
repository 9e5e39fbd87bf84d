//! Cell parsers for string-encoded race fields
//!
//! Every parser here is pure and total: malformed input degrades to `None`
//! instead of an error, so a bad cell never costs the row.
//!
//! # Example
//!
//! ```
//! use horserace::data::parser::{parse_weight, DistanceParser};
//!
//! let parser = DistanceParser::new();
//! assert_eq!(parser.parse("2m1½f"), Some(17.5));
//! assert_eq!(parse_weight(Some("9-10")).total_lb(), Some(136.0));
//! ```

use regex::Regex;

use crate::models::WeightParts;

/// Furlongs per mile
pub const FURLONGS_PER_MILE: f64 = 8.0;

/// Separator between the stone and pound parts of a weight
const WEIGHT_SEPARATOR: char = '-';

/// Standalone half-furlong token
const HALF_FURLONG: &str = "½f";

/// Coerce a text cell to a finite number, None when it is not numeric
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Race distance parser (`2m`, `1m6f`, `2m1½f`, `½f`, ...)
pub struct DistanceParser {
    miles_pattern: Regex,
    furlongs_pattern: Regex,
}

impl Default for DistanceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceParser {
    pub fn new() -> Self {
        Self {
            miles_pattern: Regex::new(r"(\d+)\s*m").expect("valid miles pattern"),
            furlongs_pattern: Regex::new(r"(\d+)?\s*(½)?\s*f").expect("valid furlongs pattern"),
        }
    }

    /// Parse a distance into furlongs
    ///
    /// Returns None when neither a miles nor a furlongs token is present.
    /// Whole furlongs come from the first furlongs token; a `½f` anywhere in
    /// the text adds the half furlong.
    pub fn parse(&self, raw: &str) -> Option<f64> {
        let miles = self
            .miles_pattern
            .captures(raw)
            .and_then(|caps| caps[1].parse::<u32>().ok());

        let furlongs = self.furlongs_pattern.captures(raw).and_then(|caps| {
            let whole = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            let half = caps.get(2).is_some() || raw.contains(HALF_FURLONG);
            match (whole, half) {
                (None, false) => None,
                (whole, half) => {
                    Some(whole.unwrap_or(0) as f64 + if half { 0.5 } else { 0.0 })
                }
            }
        });

        if miles.is_none() && furlongs.is_none() {
            return None;
        }

        Some(miles.unwrap_or(0) as f64 * FURLONGS_PER_MILE + furlongs.unwrap_or(0.0))
    }

    /// Parse an optional cell
    pub fn parse_cell(&self, raw: Option<&str>) -> Option<f64> {
        raw.and_then(|s| self.parse(s))
    }
}

/// Parse a `<stones>-<pounds>` weight
///
/// Whitespace of any kind (including non-breaking spaces) is removed first.
/// Each part is coerced on its own, so `"9-x"` still yields the stones.
pub fn parse_weight(raw: Option<&str>) -> WeightParts {
    let Some(raw) = raw else {
        return WeightParts::default();
    };

    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    match cleaned.split_once(WEIGHT_SEPARATOR) {
        Some((stones, pounds)) => WeightParts {
            stones: parse_number(stones),
            pounds: parse_number(pounds),
        },
        None => WeightParts {
            stones: parse_number(&cleaned),
            pounds: None,
        },
    }
}

/// Parse a finishing place; non-numeric codes (PU, F, UR, ...) are None
pub fn parse_place(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_examples() {
        let parser = DistanceParser::new();
        assert_eq!(parser.parse("1m6f"), Some(14.0));
        assert_eq!(parser.parse("2m"), Some(16.0));
        assert_eq!(parser.parse("6f"), Some(6.0));
        assert_eq!(parser.parse("2m1½f"), Some(17.5));
    }

    #[test]
    fn test_distance_miles_and_furlongs_formula() {
        let parser = DistanceParser::new();
        for miles in 0..4u32 {
            for furlongs in 0..8u32 {
                let text = format!("{}m{}f", miles, furlongs);
                let expected = (miles * 8 + furlongs) as f64;
                assert_eq!(parser.parse(&text), Some(expected), "{}", text);
            }
        }
    }

    #[test]
    fn test_distance_half_furlong() {
        let parser = DistanceParser::new();
        assert_eq!(parser.parse("½f"), Some(0.5));
        assert_eq!(parser.parse("5½f"), Some(5.5));
        assert_eq!(parser.parse("1m½f"), Some(8.5));
    }

    #[test]
    fn test_distance_half_marker_anywhere() {
        let parser = DistanceParser::new();
        // Whole furlongs from the first token, half from the later `½f`
        assert_eq!(parser.parse("1m6f½f"), Some(14.5));
        assert_eq!(parser.parse("6f ½f"), Some(6.5));
        assert_eq!(parser.parse("6f7f"), Some(6.0));
    }

    #[test]
    fn test_distance_either_order_and_spaces() {
        let parser = DistanceParser::new();
        assert_eq!(parser.parse("6f1m"), Some(14.0));
        assert_eq!(parser.parse("1m 6f"), Some(14.0));
        assert_eq!(parser.parse(" 2m 1½f "), Some(17.5));
    }

    #[test]
    fn test_distance_missing() {
        let parser = DistanceParser::new();
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("abc"), None);
        assert_eq!(parser.parse_cell(None), None);
    }

    #[test]
    fn test_distance_is_deterministic() {
        let parser = DistanceParser::new();
        let first = parser.parse("3m2½f");
        for _ in 0..10 {
            assert_eq!(parser.parse("3m2½f"), first);
        }
        assert_eq!(first, Some(26.5));
    }

    #[test]
    fn test_weight_examples() {
        assert_eq!(parse_weight(Some("9-10")).total_lb(), Some(136.0));
        assert_eq!(parse_weight(Some("10-0")).total_lb(), Some(140.0));
    }

    #[test]
    fn test_weight_strips_nbsp() {
        let parts = parse_weight(Some("9\u{a0}-\u{a0}10"));
        assert_eq!(parts.stones, Some(9.0));
        assert_eq!(parts.pounds, Some(10.0));
        assert_eq!(parse_weight(Some(" 11-2 ")).total_lb(), Some(156.0));
    }

    #[test]
    fn test_weight_malformed() {
        assert_eq!(parse_weight(Some("")).total_lb(), None);
        assert_eq!(parse_weight(None).total_lb(), None);

        let parts = parse_weight(Some("x-10"));
        assert_eq!(parts.stones, None);
        assert_eq!(parts.pounds, Some(10.0));
        assert_eq!(parts.total_lb(), None);

        let parts = parse_weight(Some("9"));
        assert_eq!(parts.stones, Some(9.0));
        assert_eq!(parts.pounds, None);

        assert_eq!(parse_weight(Some("9-10-2")).pounds, None);
    }

    #[test]
    fn test_parse_place() {
        assert_eq!(parse_place(Some("3")), Some(3.0));
        assert_eq!(parse_place(Some(" 1 ")), Some(1.0));
        assert_eq!(parse_place(Some("PU")), None);
        assert_eq!(parse_place(Some("nan")), None);
        assert_eq!(parse_place(None), None);
    }
}

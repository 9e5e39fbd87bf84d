use serde::{Deserialize, Serialize};
use std::fmt;

/// Input column names
pub mod columns {
    pub const DATE: &str = "Date of Race";
    pub const TRACK: &str = "Track";
    pub const TIME: &str = "Time";
    pub const PLACE: &str = "Place";
    pub const RUNNERS: &str = "Runners";
    pub const WEIGHT: &str = "Weight";
    pub const DISTANCE: &str = "Distance";
    pub const GOING: &str = "Going";
    pub const TYPE: &str = "Type";

    pub const REQUIRED: [&str; 9] = [
        DATE, TRACK, TIME, PLACE, RUNNERS, WEIGHT, DISTANCE, GOING, TYPE,
    ];

    // Derived columns, in output order after the pass-through columns
    pub const RID: &str = "rid";
    pub const NORMALIZED_POSITION: &str = "normalized_position";
    pub const WEIGHT_ST: &str = "weightSt";
    pub const WEIGHT_LB: &str = "weightLb";
    pub const WEIGHT_TOTAL_LB: &str = "weight_total_lb";
    pub const RACE_AVG_WEIGHT: &str = "race_avg_weight";
    pub const WEIGHT_DIFF_PCT: &str = "weight_diff_pct_from_race_avg";
    pub const DISTANCE_FURLONGS: &str = "distance_furlongs";
    pub const DISTANCE_BIN: &str = "distance_bin";
    pub const GOING_BIN: &str = "going_bin";
    pub const RACE_TYPE_BIN: &str = "race_type_bin";

    /// Names the pipeline writes; an input column may not reuse them
    pub const DERIVED: [&str; 11] = [
        RID,
        NORMALIZED_POSITION,
        WEIGHT_ST,
        WEIGHT_LB,
        WEIGHT_TOTAL_LB,
        RACE_AVG_WEIGHT,
        WEIGHT_DIFF_PCT,
        DISTANCE_FURLONGS,
        DISTANCE_BIN,
        GOING_BIN,
        RACE_TYPE_BIN,
    ];
}

/// Required cells of one input row, borrowed from the loaded table
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRecord<'a> {
    pub date: Option<&'a str>,
    pub track: Option<&'a str>,
    pub time: Option<&'a str>,
    pub place: Option<&'a str>,
    pub runners: Option<&'a str>,
    pub weight: Option<&'a str>,
    pub distance: Option<&'a str>,
    pub going: Option<&'a str>,
    pub race_type: Option<&'a str>,
}

/// Carried weight split into its stone and pound parts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightParts {
    pub stones: Option<f64>,
    pub pounds: Option<f64>,
}

impl WeightParts {
    pub const POUNDS_PER_STONE: f64 = 14.0;

    /// Total weight in pounds, missing if either part is missing
    pub fn total_lb(&self) -> Option<f64> {
        Some(self.stones? * Self::POUNDS_PER_STONE + self.pounds?)
    }
}

/// Track condition bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoingBin {
    Fast,
    Good,
    Soft,
    Heavy,
    Slow,
    Standard,
}

impl GoingBin {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoingBin::Fast => "fast",
            GoingBin::Good => "good",
            GoingBin::Soft => "soft",
            GoingBin::Heavy => "heavy",
            GoingBin::Slow => "slow",
            GoingBin::Standard => "standard",
        }
    }
}

impl fmt::Display for GoingBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Race classification bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceTypeBin {
    Maiden,
    Handicap,
    Stakes,
    Novice,
    Group,
    Listed,
    Hurdle,
    Chase,
    NhFlat,
    Hunters,
    Amateur,
    Unclassified,
}

impl RaceTypeBin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceTypeBin::Maiden => "maiden",
            RaceTypeBin::Handicap => "handicap",
            RaceTypeBin::Stakes => "stakes",
            RaceTypeBin::Novice => "novice",
            RaceTypeBin::Group => "group",
            RaceTypeBin::Listed => "listed",
            RaceTypeBin::Hurdle => "hurdle",
            RaceTypeBin::Chase => "chase",
            RaceTypeBin::NhFlat => "nh_flat",
            RaceTypeBin::Hunters => "hunters",
            RaceTypeBin::Amateur => "amateur",
            RaceTypeBin::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for RaceTypeBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-wise features, computed from a single row without looking at others
#[derive(Debug, Clone, PartialEq)]
pub struct RowFeatures {
    pub rid: String,
    /// None only when the row's runner count was flagged as invalid
    pub normalized_position: Option<f64>,
    pub weight: WeightParts,
    pub distance_furlongs: Option<f64>,
    pub going_bin: Option<GoingBin>,
    pub race_type_bin: Option<RaceTypeBin>,
}

impl RowFeatures {
    pub fn weight_total_lb(&self) -> Option<f64> {
        self.weight.total_lb()
    }
}

/// Race-level features, filled in once every row has been mapped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateFeatures {
    pub race_avg_weight: Option<f64>,
    pub weight_diff_pct_from_race_avg: Option<f64>,
    pub distance_bin: Option<String>,
}

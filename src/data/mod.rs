//! Data loading, cell parsing and feature computation modules

pub mod csv_loader;
pub mod features;
pub mod lookup;
pub mod parser;
pub mod placement;
pub mod race_id;

// Re-export commonly used types
pub use csv_loader::{write_csv, RaceTable, RequiredColumns};
pub use features::{DistanceBins, RaceWeightStats};
pub use lookup::{LookupTables, UnmappedCodes};
pub use parser::{parse_place, parse_weight, DistanceParser};
pub use placement::{normalize_position, Placement};
pub use race_id::RaceIdBuilder;

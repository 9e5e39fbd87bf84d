//! Horserace - feature derivation for horse racing results
//!
//! This library provides:
//! - Race identifiers built from date, track and off time
//! - Distance (`1m6f` -> 14 furlongs) and weight (`9-10` -> 136 lb) parsing
//! - Finishing position normalization against field size
//! - Going and race-type bucketing from static lookup tables
//! - Per-race weight statistics and dataset-wide distance quantile buckets
//!
//! # Example
//!
//! ```no_run
//! use horserace::data::write_csv;
//! use horserace::{FeaturePipeline, PipelineConfig, RaceTable};
//!
//! let config = PipelineConfig::default();
//! let table = RaceTable::load("results.csv")?;
//! let output = FeaturePipeline::new(config.clone())?.run(&table)?;
//! write_csv(&output.frame, "preprocessed_before_form.csv", &config.index_column)?;
//! # Ok::<(), horserace::PipelineError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use config::{DataErrorPolicy, PipelineConfig, DEFAULT_OUTPUT_FILE};
pub use data::{DistanceBins, LookupTables, RaceTable};
pub use error::{DataIssue, PipelineError};
pub use models::{GoingBin, RaceTypeBin, RowFeatures, WeightParts};
pub use pipeline::{FeaturePipeline, PipelineOutput, PipelineReport};

//! Feature derivation pipeline
//!
//! Runs in two phases:
//!
//! 1. `map_rows`: race id, placement, weight, distance and category buckets,
//!    each computed from its own row only, in input order.
//! 2. `aggregate`: per-race weight means and dataset-wide distance quantiles,
//!    which need the fully mapped columns from phase 1.
//!
//! # Example
//!
//! ```no_run
//! use horserace::{FeaturePipeline, PipelineConfig, RaceTable};
//!
//! let table = RaceTable::load("results.csv")?;
//! let pipeline = FeaturePipeline::new(PipelineConfig::default())?;
//! let output = pipeline.run(&table)?;
//! println!("{} races", output.report.races);
//! # Ok::<(), horserace::PipelineError>(())
//! ```

use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{DataErrorPolicy, PipelineConfig};
use crate::data::csv_loader::RaceTable;
use crate::data::features::{DistanceBins, RaceWeightStats};
use crate::data::lookup::{LookupTables, UnmappedCodes};
use crate::data::parser::{parse_weight, DistanceParser};
use crate::data::placement::normalize_position;
use crate::data::race_id::RaceIdBuilder;
use crate::error::{DataIssue, PipelineError};
use crate::models::{columns, AggregateFeatures, RawRecord, RowFeatures};

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub rows: usize,
    pub races: usize,
    /// Places that were non-numeric and scored as last
    pub filled_places: usize,
    pub clamped_positions: usize,
    pub missing_weight: usize,
    pub missing_distance: usize,
    pub missing_going: usize,
    pub missing_race_type: usize,
    pub unmapped: UnmappedCodes,
    pub distance_edges: Vec<f64>,
    pub distance_bin_counts: Vec<usize>,
    pub distance_bins_collapsed: bool,
    /// Data-quality errors recorded under the `flag` policy
    pub issues: Vec<DataIssue>,
}

/// Result of a pipeline run
pub struct PipelineOutput {
    pub frame: DataFrame,
    pub report: PipelineReport,
    pub distance_bins: Option<DistanceBins>,
}

/// Phase-2 results, aligned with the mapped rows
pub struct Aggregates {
    pub rows: Vec<AggregateFeatures>,
    pub distance_bins: Option<DistanceBins>,
}

/// Feature derivation pipeline
pub struct FeaturePipeline {
    config: PipelineConfig,
    tables: LookupTables,
    race_ids: RaceIdBuilder,
    distance_parser: DistanceParser,
}

impl FeaturePipeline {
    /// Create a pipeline, loading replacement lookup tables if configured
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let tables = match &config.lookup_tables {
            Some(path) => {
                let tables = LookupTables::from_path(path)?;
                info!("Using lookup tables version {} from {:?}", tables.version, path);
                tables
            }
            None => LookupTables::builtin().clone(),
        };
        Ok(Self::with_tables(config, tables))
    }

    pub fn with_tables(config: PipelineConfig, tables: LookupTables) -> Self {
        Self {
            race_ids: RaceIdBuilder::from_config(&config),
            distance_parser: DistanceParser::new(),
            config,
            tables,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    /// Run both phases and assemble the enriched table
    pub fn run(&self, table: &RaceTable) -> Result<PipelineOutput, PipelineError> {
        let mut report = PipelineReport {
            rows: table.height(),
            ..Default::default()
        };

        let rows = self.map_rows(table, &mut report)?;
        let aggregates = self.aggregate(&rows, &mut report)?;
        let frame = Self::assemble(table, &rows, &aggregates.rows)?;

        self.log_summary(&report);

        Ok(PipelineOutput {
            frame,
            report,
            distance_bins: aggregates.distance_bins,
        })
    }

    /// Phase 1: row-wise features, one per input row, in input order
    pub fn map_rows(
        &self,
        table: &RaceTable,
        report: &mut PipelineReport,
    ) -> Result<Vec<RowFeatures>, PipelineError> {
        let cols = table.required_columns()?;
        let mut rows = Vec::with_capacity(table.height());

        for i in 0..table.height() {
            rows.push(self.map_row(i, cols.record(i), report)?);
        }

        debug!("Mapped {} rows", rows.len());
        Ok(rows)
    }

    fn map_row(
        &self,
        row: usize,
        record: RawRecord<'_>,
        report: &mut PipelineReport,
    ) -> Result<RowFeatures, PipelineError> {
        let rid = self
            .race_ids
            .build(row, record.date, record.track, record.time)?;

        let placement = self.absorb(
            normalize_position(row, &rid, record.place, record.runners),
            Some(row),
            report,
        )?;
        if let Some(p) = &placement {
            report.filled_places += usize::from(p.filled);
            report.clamped_positions += usize::from(p.clamped);
        }

        let weight = parse_weight(record.weight);
        if weight.total_lb().is_none() {
            report.missing_weight += 1;
        }

        let distance_furlongs = self.distance_parser.parse_cell(record.distance);
        if distance_furlongs.is_none() {
            report.missing_distance += 1;
        }

        let going_bin = match record.going {
            Some(code) => {
                let bin = self.tables.going_bin(code);
                if bin.is_none() {
                    report.unmapped.record_going(code);
                }
                bin
            }
            None => {
                report.missing_going += 1;
                None
            }
        };

        let race_type_bin = match record.race_type {
            Some(label) => {
                let bin = self.tables.race_type_bin(label);
                if bin.is_none() {
                    report.unmapped.record_race_type(label);
                }
                bin
            }
            None => {
                report.missing_race_type += 1;
                None
            }
        };

        Ok(RowFeatures {
            rid,
            normalized_position: placement.map(|p| p.normalized),
            weight,
            distance_furlongs,
            going_bin,
            race_type_bin,
        })
    }

    /// Phase 2: race weight statistics and distance buckets
    pub fn aggregate(
        &self,
        rows: &[RowFeatures],
        report: &mut PipelineReport,
    ) -> Result<Aggregates, PipelineError> {
        let stats = RaceWeightStats::compute(
            rows.iter().map(|r| (r.rid.as_str(), r.weight_total_lb())),
        );
        report.races = stats.len();
        if stats.is_empty() {
            warn!("No rows to aggregate");
        }

        let distance_bins = DistanceBins::fit(
            rows.iter().map(|r| r.distance_furlongs),
            self.config.distance_bins,
        );
        match &distance_bins {
            Some(bins) => {
                report.distance_edges = bins.edges().to_vec();
                report.distance_bin_counts = bins.counts(rows.iter().map(|r| r.distance_furlongs));
                report.distance_bins_collapsed = bins.collapsed();
                if bins.collapsed() {
                    warn!(
                        "Distance quantile edges collapsed: {} of {} buckets remain",
                        bins.len(),
                        self.config.distance_bins
                    );
                }
                info!("Distance bucket edges: {:?}", bins.edges());
            }
            None => warn!("No parseable distances; distance_bin left empty"),
        }

        // A zero-average race is reported once, not once per runner
        let mut flagged_races: HashSet<&str> = HashSet::new();
        let mut aggregates = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            let rid = row.rid.as_str();
            let diff = match stats.diff_pct(rid, row.weight_total_lb()) {
                Ok(diff) => diff,
                Err(_) if flagged_races.contains(rid) => None,
                Err(e) => {
                    self.absorb::<()>(Err(e), Some(i), report)?;
                    flagged_races.insert(rid);
                    None
                }
            };

            aggregates.push(AggregateFeatures {
                race_avg_weight: stats.race_avg(rid),
                weight_diff_pct_from_race_avg: diff,
                distance_bin: distance_bins
                    .as_ref()
                    .and_then(|bins| bins.label(row.distance_furlongs))
                    .map(str::to_string),
            });
        }

        Ok(Aggregates {
            rows: aggregates,
            distance_bins,
        })
    }

    /// Fit distance buckets without running the rest of the pipeline
    pub fn fit_distance_bins(
        &self,
        table: &RaceTable,
    ) -> Result<Option<(DistanceBins, Vec<usize>)>, PipelineError> {
        let cols = table.required_columns()?;
        let distances: Vec<Option<f64>> = cols
            .distances()
            .map(|d| self.distance_parser.parse_cell(d))
            .collect();

        Ok(
            DistanceBins::fit(distances.iter().copied(), self.config.distance_bins).map(|bins| {
                let counts = bins.counts(distances.iter().copied());
                (bins, counts)
            }),
        )
    }

    /// Apply the data-error policy to a fallible step
    fn absorb<T>(
        &self,
        result: Result<T, PipelineError>,
        row: Option<usize>,
        report: &mut PipelineReport,
    ) -> Result<Option<T>, PipelineError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_data_quality() && self.config.on_data_error == DataErrorPolicy::Flag => {
                warn!("{}", e);
                report.issues.push(DataIssue::from_error(&e, row));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// rid first, input columns unchanged, derived columns appended
    fn assemble(
        table: &RaceTable,
        rows: &[RowFeatures],
        aggregates: &[AggregateFeatures],
    ) -> Result<DataFrame, PipelineError> {
        let mut df = table.frame().clone();

        let rids: Vec<&str> = rows.iter().map(|r| r.rid.as_str()).collect();
        df.insert_column(0, Series::new(columns::RID.into(), rids))?;

        let derived = [
            Series::new(
                columns::NORMALIZED_POSITION.into(),
                rows.iter().map(|r| r.normalized_position).collect::<Vec<_>>(),
            ),
            Series::new(
                columns::WEIGHT_ST.into(),
                rows.iter().map(|r| r.weight.stones).collect::<Vec<_>>(),
            ),
            Series::new(
                columns::WEIGHT_LB.into(),
                rows.iter().map(|r| r.weight.pounds).collect::<Vec<_>>(),
            ),
            Series::new(
                columns::WEIGHT_TOTAL_LB.into(),
                rows.iter().map(|r| r.weight_total_lb()).collect::<Vec<_>>(),
            ),
            Series::new(
                columns::RACE_AVG_WEIGHT.into(),
                aggregates.iter().map(|a| a.race_avg_weight).collect::<Vec<_>>(),
            ),
            Series::new(
                columns::WEIGHT_DIFF_PCT.into(),
                aggregates
                    .iter()
                    .map(|a| a.weight_diff_pct_from_race_avg)
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                columns::DISTANCE_FURLONGS.into(),
                rows.iter().map(|r| r.distance_furlongs).collect::<Vec<_>>(),
            ),
            Series::new(
                columns::DISTANCE_BIN.into(),
                aggregates
                    .iter()
                    .map(|a| a.distance_bin.as_deref())
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                columns::GOING_BIN.into(),
                rows.iter()
                    .map(|r| r.going_bin.map(|b| b.as_str()))
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                columns::RACE_TYPE_BIN.into(),
                rows.iter()
                    .map(|r| r.race_type_bin.map(|b| b.as_str()))
                    .collect::<Vec<_>>(),
            ),
        ];

        for series in derived {
            df.with_column(series)?;
        }

        Ok(df)
    }

    fn log_summary(&self, report: &PipelineReport) {
        info!("Processed {} rows in {} races", report.rows, report.races);
        if report.missing_weight > 0 {
            warn!("{} rows have no usable weight", report.missing_weight);
        }
        if report.missing_distance > 0 {
            warn!("{} rows have no usable distance", report.missing_distance);
        }
        if !report.unmapped.going.is_empty() {
            warn!(
                "{} rows with unmapped going codes: {:?}",
                report.unmapped.going_rows(),
                report.unmapped.going.keys().collect::<Vec<_>>()
            );
        }
        if !report.unmapped.race_type.is_empty() {
            warn!(
                "{} rows with unmapped race types: {:?}",
                report.unmapped.race_type_rows(),
                report.unmapped.race_type.keys().collect::<Vec<_>>()
            );
        }
        if !report.issues.is_empty() {
            warn!("{} data-quality issues flagged", report.issues.len());
        }
    }
}

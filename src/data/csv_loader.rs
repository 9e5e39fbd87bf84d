//! CSV loading and saving for race result tables

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::{columns, RawRecord};

/// Race results table with every column read as text
pub struct RaceTable {
    df: DataFrame,
}

impl RaceTable {
    /// Load a results CSV; all columns are kept as text so pass-through
    /// columns are written back untouched
    pub fn load<P: AsRef<Path>>(csv_path: P) -> Result<Self, PipelineError> {
        let path = csv_path.as_ref();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        info!(
            "Loaded {} rows x {} columns from {:?}",
            df.height(),
            df.width(),
            path
        );

        Self::from_frame(df)
    }

    /// Wrap an in-memory frame, checking the required columns first
    pub fn from_frame(df: DataFrame) -> Result<Self, PipelineError> {
        if let Some(missing) = columns::REQUIRED
            .iter()
            .find(|name| df.get_column_index(name).is_none())
        {
            return Err(PipelineError::MissingColumn(missing.to_string()));
        }
        if let Some(reserved) = columns::DERIVED
            .iter()
            .find(|name| df.get_column_index(name).is_some())
        {
            return Err(PipelineError::ReservedColumn(reserved.to_string()));
        }
        Ok(Self { df })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// A column as text, whatever its stored type
    pub fn text_column(&self, name: &str) -> Result<StringChunked, PipelineError> {
        let column = self
            .df
            .column(name)
            .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
        let text = column.cast(&DataType::String)?;
        Ok(text.str()?.clone())
    }

    /// Text views of the required columns
    pub fn required_columns(&self) -> Result<RequiredColumns, PipelineError> {
        Ok(RequiredColumns {
            date: self.text_column(columns::DATE)?,
            track: self.text_column(columns::TRACK)?,
            time: self.text_column(columns::TIME)?,
            place: self.text_column(columns::PLACE)?,
            runners: self.text_column(columns::RUNNERS)?,
            weight: self.text_column(columns::WEIGHT)?,
            distance: self.text_column(columns::DISTANCE)?,
            going: self.text_column(columns::GOING)?,
            race_type: self.text_column(columns::TYPE)?,
        })
    }
}

/// The required input columns as text
pub struct RequiredColumns {
    date: StringChunked,
    track: StringChunked,
    time: StringChunked,
    place: StringChunked,
    runners: StringChunked,
    weight: StringChunked,
    distance: StringChunked,
    going: StringChunked,
    race_type: StringChunked,
}

impl RequiredColumns {
    /// Borrowed view of row `i`
    pub fn record(&self, i: usize) -> RawRecord<'_> {
        RawRecord {
            date: self.date.get(i),
            track: self.track.get(i),
            time: self.time.get(i),
            place: self.place.get(i),
            runners: self.runners.get(i),
            weight: self.weight.get(i),
            distance: self.distance.get(i),
            going: self.going.get(i),
            race_type: self.race_type.get(i),
        }
    }

    /// Distance cells only
    pub fn distances(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        (&self.distance).into_iter()
    }
}

/// Write a table as CSV with a leading row-index column
pub fn write_csv<P: AsRef<Path>>(
    df: &DataFrame,
    csv_path: P,
    index_column: &str,
) -> Result<(), PipelineError> {
    let path = csv_path.as_ref();
    let mut out = df.with_row_index(index_column.into(), None)?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut out)?;

    debug!("Wrote columns {:?}", out.get_column_names());
    info!("Saved {} rows to {:?}", out.height(), path);
    Ok(())
}

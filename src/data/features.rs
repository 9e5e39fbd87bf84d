//! Race-level and dataset-level features
//!
//! Both computations here need a fully mapped column before they can run:
//! the race weight mean needs every runner of the race, and the distance
//! quantiles need every row of the dataset.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{validate_race_average, PipelineError};

/// Decimal places kept in distance bucket labels, raised while labels collide
const LABEL_PRECISION: i32 = 3;
const MAX_LABEL_PRECISION: i32 = 19;

/// Mean carried weight per race
#[derive(Debug, Clone, Default)]
pub struct RaceWeightStats {
    /// rid -> mean weight, None when every weight in the race is missing
    means: HashMap<String, Option<f64>>,
}

impl RaceWeightStats {
    /// Compute per-race means, skipping missing weights
    pub fn compute<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<f64>)>,
    {
        let mut sums: HashMap<&'a str, (f64, usize)> = HashMap::new();
        for (rid, weight) in rows {
            let entry = sums.entry(rid).or_insert((0.0, 0));
            if let Some(w) = weight {
                entry.0 += w;
                entry.1 += 1;
            }
        }

        let means = sums
            .into_iter()
            .map(|(rid, (sum, count))| {
                let mean = if count > 0 {
                    Some(sum / count as f64)
                } else {
                    None
                };
                (rid.to_string(), mean)
            })
            .collect();

        Self { means }
    }

    /// Mean weight of a race
    pub fn race_avg(&self, rid: &str) -> Option<f64> {
        self.means.get(rid).copied().flatten()
    }

    /// Relative deviation of a runner's weight from its race mean
    ///
    /// Missing when either the weight or the mean is missing. A zero mean is
    /// an error rather than an infinite deviation.
    pub fn diff_pct(&self, rid: &str, weight: Option<f64>) -> Result<Option<f64>, PipelineError> {
        let Some(mean) = self.race_avg(rid) else {
            return Ok(None);
        };
        let mean = validate_race_average(rid, mean)?;
        Ok(weight.map(|w| (w - mean) / mean))
    }

    /// Number of races
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

/// Equal-frequency buckets over the distance column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceBins {
    edges: Vec<f64>,
    labels: Vec<String>,
    /// Buckets requested before duplicate edges were dropped
    requested: usize,
}

impl DistanceBins {
    /// Fit bucket edges to the non-missing values
    ///
    /// Returns None when there is nothing to fit. Duplicate edges (from
    /// heavily repeated distances) are dropped, leaving fewer buckets.
    pub fn fit<I>(values: I, bins: usize) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        if bins == 0 {
            return None;
        }

        let mut sorted: Vec<f64> = values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut edges: Vec<f64> = (0..=bins)
            .map(|i| quantile(&sorted, i as f64 / bins as f64))
            .collect();
        edges.dedup();
        if edges.len() == 1 {
            // Single distinct value: one closed bucket
            edges.push(edges[0]);
        }

        let labels = Self::make_labels(&edges);

        Some(Self {
            edges,
            labels,
            requested: bins,
        })
    }

    fn make_labels(edges: &[f64]) -> Vec<String> {
        let precision = label_precision(edges);
        edges
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let left = if i == 0 {
                    round_frac(pair[0] - 10f64.powi(-precision), precision)
                } else {
                    round_frac(pair[0], precision)
                };
                let right = round_frac(pair[1], precision);
                format!("({}, {}]", format_edge(left), format_edge(right))
            })
            .collect()
    }

    /// Bucket edges, ascending
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of buckets actually produced
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether duplicate edges reduced the bucket count
    pub fn collapsed(&self) -> bool {
        self.len() < self.requested
    }

    /// Bucket index of a value; the first bucket includes its lower edge
    pub fn assign(&self, value: f64) -> Option<usize> {
        let first = *self.edges.first()?;
        let last = *self.edges.last()?;
        if !value.is_finite() || value < first || value > last {
            return None;
        }
        let idx = self.edges[1..].partition_point(|&edge| edge < value);
        (idx < self.len()).then_some(idx)
    }

    /// Bucket label of a value
    pub fn label(&self, value: Option<f64>) -> Option<&str> {
        let idx = self.assign(value?)?;
        self.labels.get(idx).map(String::as_str)
    }

    /// Row count per bucket
    pub fn counts<I>(&self, values: I) -> Vec<usize>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut counts = vec![0; self.len()];
        for idx in values.into_iter().flatten().filter_map(|v| self.assign(v)) {
            counts[idx] += 1;
        }
        counts
    }
}

/// Linear-interpolated quantile of sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Smallest precision at which distinct edges stay distinct once rounded
fn label_precision(edges: &[f64]) -> i32 {
    (LABEL_PRECISION..=MAX_LABEL_PRECISION)
        .find(|&precision| {
            edges.windows(2).all(|pair| {
                pair[0] == pair[1]
                    || round_frac(pair[0], precision) != round_frac(pair[1], precision)
            })
        })
        .unwrap_or(LABEL_PRECISION)
}

/// Round keeping `precision` significant decimals after any leading zeros
fn round_frac(x: f64, precision: i32) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    let digits = if x.trunc() == 0.0 {
        -(x.fract().abs().log10().floor() as i32) - 1 + precision
    } else {
        precision
    };
    let scale = 10f64.powi(digits);
    (x * scale).round() / scale
}

fn format_edge(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

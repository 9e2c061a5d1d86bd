use crate::error::{MetricsError, Result};
use serde::Serialize;
use std::fmt;

/// A quantile to report, strictly between 0 and 1.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
pub struct Percentile(f64);

impl Percentile {
    pub fn new(quantile: f64) -> Result<Percentile> {
        if quantile.is_finite() && quantile > 0.0 && quantile < 1.0 {
            Ok(Percentile(quantile))
        } else {
            Err(MetricsError::InvalidArgument(format!(
                "percentile {} is outside (0, 1)",
                quantile
            )))
        }
    }

    pub fn quantile(self) -> f64 { self.0 }

    /// Label used when rendering, e.g. `0.999`.
    pub fn label(self) -> String { format!("{}", self.0) }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Percentiles reported when no override is configured.
pub fn default_percentiles() -> Vec<Percentile> {
    [0.5, 0.75, 0.95, 0.98, 0.99, 0.999]
        .iter()
        .map(|q| Percentile(*q))
        .collect()
}

/// Value observed at a configured percentile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PercentileValue {
    pub percentile: Percentile,
    pub value: f64,
}

/// Number of observations less than or equal to `upper_bound`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BucketCount {
    pub upper_bound: f64,
    pub count: u64,
}

/// A point-in-time view of a distribution.
///
/// `count` and `sum` cover every recorded value.  The remaining statistics are computed from the
/// values retained by the reservoir at the time the snapshot was taken.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    mean: f64,
    std_dev: f64,
    values: Vec<f64>,
    percentiles: Vec<PercentileValue>,
    buckets: Vec<BucketCount>,
}

impl Snapshot {
    pub(crate) fn from_values(count: u64, sum: f64, mut values: Vec<f64>, percentiles: &[Percentile]) -> Snapshot {
        values.sort_by(|a, b| a.total_cmp(b));

        let n = values.len();
        let (min, max, mean, std_dev) = if n == 0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let mean = values.iter().sum::<f64>() / n as f64;
            let std_dev = if n > 1 {
                let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64;
                variance.sqrt()
            } else {
                0.0
            };
            (values[0], values[n - 1], mean, std_dev)
        };

        let percentiles = percentiles
            .iter()
            .map(|p| PercentileValue {
                percentile: *p,
                value: quantile_of(&values, p.quantile()),
            })
            .collect();

        Snapshot {
            count,
            sum,
            min,
            max,
            mean,
            std_dev,
            values,
            percentiles,
            buckets: Vec::new(),
        }
    }

    pub(crate) fn with_buckets(mut self, buckets: Vec<BucketCount>) -> Snapshot {
        self.buckets = buckets;
        self
    }

    /// Number of values ever recorded.
    pub fn count(&self) -> u64 { self.count }

    /// Sum of every value ever recorded.
    pub fn sum(&self) -> f64 { self.sum }

    pub fn min(&self) -> f64 { self.min }

    pub fn max(&self) -> f64 { self.max }

    pub fn mean(&self) -> f64 { self.mean }

    pub fn std_dev(&self) -> f64 { self.std_dev }

    /// Number of retained values.
    pub fn size(&self) -> usize { self.values.len() }

    /// Retained values in ascending order.
    pub fn values(&self) -> &[f64] { &self.values }

    /// Value at an arbitrary quantile of the retained values, `0` when empty.
    pub fn value(&self, quantile: f64) -> f64 { quantile_of(&self.values, quantile) }

    pub fn median(&self) -> f64 { self.value(0.5) }

    pub fn p75(&self) -> f64 { self.value(0.75) }

    pub fn p95(&self) -> f64 { self.value(0.95) }

    pub fn p98(&self) -> f64 { self.value(0.98) }

    pub fn p99(&self) -> f64 { self.value(0.99) }

    pub fn p999(&self) -> f64 { self.value(0.999) }

    /// Values at the percentiles configured for the metric.
    pub fn percentile_values(&self) -> &[PercentileValue] { &self.percentiles }

    /// Cumulative bucket counts configured for the metric.
    pub fn buckets(&self) -> &[BucketCount] { &self.buckets }
}

// Picks the element at `ceil(q * n) - 1`, clipped to the valid range.
fn quantile_of(sorted: &[f64], quantile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let n = sorted.len();
    let rank = (quantile * n as f64).ceil() as i64 - 1;
    let index = rank.max(0).min(n as i64 - 1) as usize;
    sorted[index]
}

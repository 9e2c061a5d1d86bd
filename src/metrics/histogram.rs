use crate::{
    clock::Clock,
    data::{Buckets, DecayingReservoir, Percentile, Snapshot},
    error::{MetricsError, Result},
    metrics::Attachment,
};
use std::convert::TryFrom;

/// Distribution of observed values.
pub struct Histogram {
    pub(crate) attachment: Attachment,
    clock: Clock,
    reservoir: DecayingReservoir,
    buckets: Buckets,
    percentiles: Vec<Percentile>,
}

impl Histogram {
    pub(crate) fn new(
        name: String, clock: Clock, reservoir: DecayingReservoir, percentiles: Vec<Percentile>, buckets: Vec<f64>,
    ) -> Histogram {
        Histogram {
            attachment: Attachment::new(name),
            clock,
            reservoir,
            buckets: Buckets::new(buckets),
            percentiles,
        }
    }

    /// Records an integral value.
    pub fn update(&self, value: i64) -> Result<()> { self.update_f64(value as f64) }

    /// Records a value.  NaN and infinities are refused.
    pub fn update_f64(&self, value: f64) -> Result<()> {
        self.attachment.check()?;
        if !value.is_finite() {
            return Err(MetricsError::InvalidArgument(format!("histogram value {} is not finite", value)));
        }
        self.reservoir.update(value, self.clock.now());
        self.buckets.record(value);
        Ok(())
    }

    /// Number of values ever recorded.
    pub fn count(&self) -> i64 { i64::try_from(self.reservoir.count()).unwrap_or(i64::MAX) }

    /// Sum of every value ever recorded.
    pub fn sum(&self) -> f64 { self.reservoir.sum() }

    /// Percentiles this histogram reports.
    pub fn percentiles(&self) -> &[Percentile] { &self.percentiles }

    pub fn snapshot(&self) -> Snapshot {
        self.reservoir
            .snapshot(&self.percentiles)
            .with_buckets(self.buckets.snapshot())
    }
}

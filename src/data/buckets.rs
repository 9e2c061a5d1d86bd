use crate::data::snapshot::BucketCount;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counts of observations per configured upper bound.
pub struct Buckets {
    bounds: Vec<f64>,
    counts: Vec<AtomicU64>,
}

impl Buckets {
    /// `bounds` must be sorted ascending.
    pub fn new(bounds: Vec<f64>) -> Buckets {
        let counts = bounds.iter().map(|_| AtomicU64::new(0)).collect();
        Buckets { bounds, counts }
    }

    /// Counts `value` in the first bucket whose bound is not below it.  NaN is ignored.
    pub fn record(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        let index = self.bounds.partition_point(|bound| *bound < value);
        if let Some(count) = self.counts.get(index) {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Cumulative counts, one per bound.
    pub fn snapshot(&self) -> Vec<BucketCount> {
        let mut running = 0;
        self.bounds
            .iter()
            .zip(&self.counts)
            .map(|(bound, count)| {
                running += count.load(Ordering::Relaxed);
                BucketCount {
                    upper_bound: *bound,
                    count: running,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Buckets;

    #[test]
    fn test_cumulative_counts() {
        let buckets = Buckets::new(vec![1.0, 5.0, 10.0]);
        for v in &[0.5, 1.0, 3.0, 5.0, 7.0, 11.0] {
            buckets.record(*v);
        }

        let counts: Vec<u64> = buckets.snapshot().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 4, 5]);
    }

    #[test]
    fn test_nan_not_counted() {
        let buckets = Buckets::new(vec![1.0, 5.0]);
        buckets.record(std::f64::NAN);
        buckets.record(std::f64::INFINITY);
        buckets.record(0.5);

        let counts: Vec<u64> = buckets.snapshot().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn test_no_bounds() {
        let buckets = Buckets::new(Vec::new());
        buckets.record(1.0);
        assert!(buckets.snapshot().is_empty());
    }
}

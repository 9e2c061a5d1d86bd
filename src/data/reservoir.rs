use crate::data::snapshot::{Percentile, Snapshot};
use parking_lot::Mutex;
use rand::Rng;
use std::{cmp::Ordering, collections::BTreeMap};

/// Number of samples retained by default.
pub const DEFAULT_SIZE: usize = 1028;

/// Decay factor by default; heavily biases the sample toward the last five minutes.
pub const DEFAULT_ALPHA: f64 = 0.015;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;
const RESCALE_THRESHOLD_NANOS: u64 = 60 * 60 * 1_000_000_000;

/// A fixed-size sample of observed values using forward exponential decay.
///
/// Each value is weighted by `exp(alpha * age)` relative to a landmark time and kept with a random
/// priority scaled by that weight, so recent values are proportionally more likely to survive.
/// Weights are rescaled against a new landmark every hour to keep them finite.
pub struct DecayingReservoir {
    size: usize,
    alpha: f64,
    inner: Mutex<Inner>,
}

struct Inner {
    samples: BTreeMap<Priority, f64>,
    count: u64,
    sum: f64,
    landmark: u64,
    next_rescale: u64,
}

#[derive(Clone, Copy, Debug)]
struct Priority(f64);

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering { self.0.total_cmp(&other.0) }
}

impl DecayingReservoir {
    /// Creates a reservoir whose decay landmark is `start` (nanoseconds).
    pub fn new(size: usize, alpha: f64, start: u64) -> DecayingReservoir {
        DecayingReservoir {
            size: size.max(1),
            alpha,
            inner: Mutex::new(Inner {
                samples: BTreeMap::new(),
                count: 0,
                sum: 0.0,
                landmark: start,
                next_rescale: start + RESCALE_THRESHOLD_NANOS,
            }),
        }
    }

    /// Records a value observed at `timestamp` (nanoseconds).
    pub fn update(&self, value: f64, timestamp: u64) {
        let mut inner = self.inner.lock();
        if timestamp >= inner.next_rescale {
            self.rescale(&mut inner, timestamp);
        }

        inner.count += 1;
        inner.sum += value;

        let weight = self.weight(timestamp.saturating_sub(inner.landmark));
        let priority = Priority(weight / draw());

        if inner.samples.len() < self.size {
            inner.samples.insert(priority, value);
            return;
        }

        let lowest = match inner.samples.keys().next() {
            Some(lowest) => *lowest,
            None => return,
        };
        if lowest < priority && !inner.samples.contains_key(&priority) {
            inner.samples.insert(priority, value);
            inner.samples.remove(&lowest);
        }
    }

    /// Number of values currently retained.
    pub fn size(&self) -> usize { self.inner.lock().samples.len() }

    /// Number of values ever recorded.
    pub fn count(&self) -> u64 { self.inner.lock().count }

    /// Sum of every value ever recorded.
    pub fn sum(&self) -> f64 { self.inner.lock().sum }

    /// Takes a snapshot of the retained values.
    pub fn snapshot(&self, percentiles: &[Percentile]) -> Snapshot {
        let inner = self.inner.lock();
        let values = inner.samples.values().copied().collect();
        Snapshot::from_values(inner.count, inner.sum, values, percentiles)
    }

    fn weight(&self, age_nanos: u64) -> f64 { (self.alpha * (age_nanos as f64 / NANOS_PER_SEC)).exp() }

    // Moves the landmark to `now`, scaling every priority by the same factor so relative order
    // (and therefore eviction behavior) is unchanged.  Priorities that underflow after a long
    // idle gap are redrawn just above zero, below any priority taken at the new landmark.
    fn rescale(&self, inner: &mut Inner, now: u64) {
        let factor = (-self.alpha * (now.saturating_sub(inner.landmark) as f64 / NANOS_PER_SEC)).exp();
        let old = std::mem::take(&mut inner.samples);
        for (priority, value) in old {
            let mut scaled = Priority(priority.0 * factor);
            while !scaled.0.is_normal() || inner.samples.contains_key(&scaled) {
                scaled = Priority(f64::MIN_POSITIVE / draw());
            }
            inner.samples.insert(scaled, value);
        }

        inner.landmark = now;
        inner.next_rescale = now + RESCALE_THRESHOLD_NANOS;
    }
}

// A uniform draw from (0, 1], never zero so it can divide.
fn draw() -> f64 { 1.0 - rand::thread_rng().gen::<f64>() }

#[cfg(test)]
mod tests {
    use super::{DecayingReservoir, DEFAULT_ALPHA, DEFAULT_SIZE};
    use crate::data::snapshot::default_percentiles;

    const SECOND: u64 = 1_000_000_000;

    #[test]
    fn test_reservoir_under_capacity() {
        let reservoir = DecayingReservoir::new(DEFAULT_SIZE, DEFAULT_ALPHA, 0);
        for i in 0..200 {
            reservoir.update(f64::from(i), i as u64 * SECOND / 10);
        }

        assert_eq!(reservoir.size(), 200);
        let snapshot = reservoir.snapshot(&default_percentiles());
        assert_eq!(snapshot.size(), 200);
        assert_eq!(snapshot.count(), 200);
        assert_eq!(snapshot.min(), 0.0);
        assert_eq!(snapshot.max(), 199.0);
        assert_eq!(snapshot.median(), 99.0);
        assert_eq!(snapshot.sum(), (0..200).sum::<i32>() as f64);
    }

    #[test]
    fn test_reservoir_capped() {
        let reservoir = DecayingReservoir::new(100, DEFAULT_ALPHA, 0);
        for i in 0..1000 {
            reservoir.update(10.0, i * SECOND);
        }

        assert_eq!(reservoir.size(), 100);
        let snapshot = reservoir.snapshot(&[]);
        assert_eq!(snapshot.count(), 1000);
        assert_eq!(snapshot.size(), 100);
        assert_eq!(snapshot.mean(), 10.0);
    }

    #[test]
    fn test_reservoir_prefers_recent_values() {
        let reservoir = DecayingReservoir::new(100, DEFAULT_ALPHA, 0);
        for i in 0..1000 {
            reservoir.update(1.0, i * SECOND / 100);
        }

        // Fifty minutes on, new weights dwarf anything a single draw can give the old ones.
        let later = 3000 * SECOND;
        for i in 0..1000 {
            reservoir.update(2.0, later + i * SECOND / 100);
        }

        let snapshot = reservoir.snapshot(&[]);
        assert_eq!(snapshot.size(), 100);
        assert_eq!(snapshot.median(), 2.0);
        assert_eq!(snapshot.min(), 2.0);
    }

    #[test]
    fn test_reservoir_rescales_after_an_hour() {
        let reservoir = DecayingReservoir::new(10, DEFAULT_ALPHA, 0);
        reservoir.update(5.0, 0);

        let two_hours = 2 * 60 * 60 * SECOND;
        reservoir.update(6.0, two_hours);

        let snapshot = reservoir.snapshot(&[]);
        assert_eq!(snapshot.size(), 2);
        assert_eq!(snapshot.count(), 2);
        assert!(snapshot.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_reservoir_keeps_samples_across_long_idle_gap() {
        let reservoir = DecayingReservoir::new(DEFAULT_SIZE, DEFAULT_ALPHA, 0);
        for i in 0..200 {
            reservoir.update(f64::from(i as u32), i * SECOND);
        }

        // Long enough for the rescale factor to underflow to zero.
        let sixteen_hours = 16 * 60 * 60 * SECOND;
        reservoir.update(1000.0, sixteen_hours);

        let snapshot = reservoir.snapshot(&[]);
        assert_eq!(snapshot.count(), 201);
        assert_eq!(snapshot.size(), 201);
        assert_eq!(snapshot.max(), 1000.0);
        assert!(snapshot.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_recent_values_outrank_redrawn_ones() {
        let reservoir = DecayingReservoir::new(10, DEFAULT_ALPHA, 0);
        for i in 0..10 {
            reservoir.update(1.0, i * SECOND);
        }

        let sixteen_hours = 16 * 60 * 60 * SECOND;
        for i in 0..10 {
            reservoir.update(2.0, sixteen_hours + i * SECOND);
        }

        let snapshot = reservoir.snapshot(&[]);
        assert_eq!(snapshot.size(), 10);
        assert_eq!(snapshot.min(), 2.0);
    }

    #[test]
    fn test_snapshot_is_a_pure_read() {
        let reservoir = DecayingReservoir::new(DEFAULT_SIZE, DEFAULT_ALPHA, 0);
        for i in 0..50 {
            reservoir.update(f64::from(i * 3 % 17), 0);
        }

        let a = reservoir.snapshot(&default_percentiles());
        let b = reservoir.snapshot(&default_percentiles());
        assert_eq!(a, b);
    }
}

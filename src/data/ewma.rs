use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Seconds between ticks.
pub const TICK_INTERVAL_SECS: u64 = 5;

const SECONDS_PER_MINUTE: f64 = 60.0;

/// An exponentially-weighted moving average of an event rate.
///
/// Events are accumulated with `update` and folded into the average on every `tick`, which must
/// be called once per [`TICK_INTERVAL_SECS`].  The average decays like a Unix load average over
/// the configured window.
pub struct Ewma {
    alpha: f64,
    uncounted: AtomicI64,
    // f64 bits, events per second.
    rate: AtomicU64,
    initialized: AtomicBool,
}

impl Ewma {
    /// Creates an average over a window of `minutes`.
    pub fn with_window(minutes: f64) -> Ewma {
        let alpha = 1.0 - (-(TICK_INTERVAL_SECS as f64) / SECONDS_PER_MINUTE / minutes).exp();
        Ewma {
            alpha,
            uncounted: AtomicI64::new(0),
            rate: AtomicU64::new(0f64.to_bits()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn one_minute() -> Ewma { Ewma::with_window(1.0) }

    pub fn five_minutes() -> Ewma { Ewma::with_window(5.0) }

    pub fn fifteen_minutes() -> Ewma { Ewma::with_window(15.0) }

    /// Adds `n` events to the current interval.
    pub fn update(&self, n: i64) { self.uncounted.fetch_add(n, Ordering::Relaxed); }

    /// Folds the current interval into the average.
    pub fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::AcqRel);
        let instant = count as f64 / TICK_INTERVAL_SECS as f64;

        if self.initialized.swap(true, Ordering::AcqRel) {
            let rate = self.load();
            self.store(rate + self.alpha * (instant - rate));
        } else {
            self.store(instant);
        }
    }

    /// Applies `ticks` ticks during which nothing happened.
    pub fn decay(&self, ticks: u64) {
        if ticks == 0 || !self.initialized.load(Ordering::Acquire) {
            return;
        }
        let factor = (1.0 - self.alpha).powf(ticks as f64);
        self.store(self.load() * factor);
    }

    /// Current rate in events per second.
    pub fn rate(&self) -> f64 { self.load() }

    fn load(&self) -> f64 { f64::from_bits(self.rate.load(Ordering::Acquire)) }

    fn store(&self, rate: f64) { self.rate.store(rate.to_bits(), Ordering::Release); }
}

use crate::{
    clock::Clock,
    data::ewma::{Ewma, TICK_INTERVAL_SECS},
};
use std::{
    sync::atomic::{AtomicI64, AtomicU64, Ordering},
    time::Duration,
};

const TICK_INTERVAL_NANOS: u64 = TICK_INTERVAL_SECS * 1_000_000_000;

/// Event count with 1, 5 and 15 minute moving rates and an exact mean rate.
///
/// There is no background ticker.  Every read and write first catches the averages up with the
/// number of whole tick intervals that elapsed since the last tick, so rates stay correct however
/// rarely they are polled.
pub struct Rates {
    clock: Clock,
    start: u64,
    last_tick: AtomicU64,
    count: AtomicI64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl Rates {
    pub fn new(clock: Clock) -> Rates {
        let start = clock.now();
        Rates {
            clock,
            start,
            last_tick: AtomicU64::new(start),
            count: AtomicI64::new(0),
            m1: Ewma::one_minute(),
            m5: Ewma::five_minutes(),
            m15: Ewma::fifteen_minutes(),
        }
    }

    /// Records `n` events.
    pub fn mark(&self, n: i64) {
        self.tick_if_necessary();
        self.count.fetch_add(n, Ordering::Relaxed);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    pub fn count(&self) -> i64 { self.count.load(Ordering::Relaxed) }

    pub fn one_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m1.rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m5.rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m15.rate()
    }

    /// Events per second since creation.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }

        let elapsed = self.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        count as f64 / elapsed
    }

    /// Time since creation.
    pub fn elapsed(&self) -> Duration { self.clock.delta(self.start, self.clock.now()) }

    fn tick_if_necessary(&self) {
        let old = self.last_tick.load(Ordering::Acquire);
        let now = self.clock.now();
        let age = now.saturating_sub(old);
        if age < TICK_INTERVAL_NANOS {
            return;
        }

        // Only the thread that moves the tick forward applies the ticks.
        let new_tick = now - age % TICK_INTERVAL_NANOS;
        if self
            .last_tick
            .compare_exchange(old, new_tick, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let required = age / TICK_INTERVAL_NANOS;
        for ewma in &[&self.m1, &self.m5, &self.m15] {
            ewma.tick();
            ewma.decay(required - 1);
        }
    }
}

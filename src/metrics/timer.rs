use crate::{
    clock::Clock,
    data::{Buckets, DecayingReservoir, Percentile, Rates, Snapshot},
    error::Result,
    metrics::Attachment,
};
use std::{
    convert::TryFrom,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Whole nanoseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn saturating_nanos(duration: Duration) -> u64 { u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX) }

/// Adds `nanos` to a running total without wrapping.
pub(crate) fn accumulate(total: &AtomicU64, nanos: u64) {
    let _ = total.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| Some(t.saturating_add(nanos)));
}

/// Something that accepts measured durations.
pub(crate) trait Recorder: Sync {
    fn clock(&self) -> &Clock;

    fn record(&self, duration: Duration) -> Result<()>;
}

/// A running measurement started by `time()`.
///
/// The measurement is recorded once, either by `stop` or when the context is dropped, so a
/// closure that panics is still timed.
pub struct Context<'a> {
    recorder: &'a dyn Recorder,
    start: u64,
    outcome: Option<Result<Duration>>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(recorder: &'a dyn Recorder) -> Context<'a> {
        Context {
            recorder,
            start: recorder.clock().now(),
            outcome: None,
        }
    }

    /// Stops the measurement and records it, returning the elapsed time.
    ///
    /// Later calls record nothing and return the first result, error included.
    pub fn stop(&mut self) -> Result<Duration> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let clock = self.recorder.clock();
        let elapsed = clock.delta(self.start, clock.now());
        let outcome = self.recorder.record(elapsed).map(|_| elapsed);
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl<'a> Drop for Context<'a> {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            let _ = self.stop();
        }
    }
}

/// Distribution of durations plus the rate at which they occur.
pub struct Timer {
    pub(crate) attachment: Attachment,
    clock: Clock,
    rates: Rates,
    reservoir: DecayingReservoir,
    buckets: Buckets,
    percentiles: Vec<Percentile>,
    elapsed: AtomicU64,
}

impl Timer {
    /// `buckets` are upper bounds in nanoseconds.
    pub(crate) fn new(
        name: String, clock: Clock, reservoir: DecayingReservoir, percentiles: Vec<Percentile>, buckets: Vec<f64>,
    ) -> Timer {
        Timer {
            attachment: Attachment::new(name),
            rates: Rates::new(clock.clone()),
            clock,
            reservoir,
            buckets: Buckets::new(buckets),
            percentiles,
            elapsed: AtomicU64::new(0),
        }
    }

    /// Records a duration.
    pub fn update(&self, duration: Duration) -> Result<()> {
        self.attachment.check()?;
        let nanos = saturating_nanos(duration);
        self.rates.mark(1);
        self.reservoir.update(nanos as f64, self.clock.now());
        self.buckets.record(nanos as f64);
        accumulate(&self.elapsed, nanos);
        Ok(())
    }

    /// Starts timing.
    pub fn time(&self) -> Context<'_> { Context::new(self) }

    /// Times `f`, also recording the duration if `f` panics.
    pub fn time_fn<F: FnOnce() -> R, R>(&self, f: F) -> Result<R> {
        self.attachment.check()?;
        let mut context = self.time();
        let result = f();
        context.stop()?;
        Ok(result)
    }

    /// Number of durations recorded.
    pub fn count(&self) -> i64 { self.rates.count() }

    /// Sum of every duration recorded.
    pub fn elapsed_time(&self) -> Duration { Duration::from_nanos(self.elapsed.load(Ordering::Relaxed)) }

    /// Percentiles this timer reports.
    pub fn percentiles(&self) -> &[Percentile] { &self.percentiles }

    /// Snapshot of recorded durations, in nanoseconds.
    pub fn snapshot(&self) -> Snapshot {
        self.reservoir
            .snapshot(&self.percentiles)
            .with_buckets(self.buckets.snapshot())
    }

    pub fn one_minute_rate(&self) -> f64 { self.rates.one_minute_rate() }

    pub fn five_minute_rate(&self) -> f64 { self.rates.five_minute_rate() }

    pub fn fifteen_minute_rate(&self) -> f64 { self.rates.fifteen_minute_rate() }

    pub fn mean_rate(&self) -> f64 { self.rates.mean_rate() }
}

impl Recorder for Timer {
    fn clock(&self) -> &Clock { &self.clock }

    fn record(&self, duration: Duration) -> Result<()> { self.update(duration) }
}

#[cfg(test)]
mod tests {
    use super::Timer;
    use crate::{
        clock::{Clock, Mock},
        data::{default_percentiles, reservoir, DecayingReservoir},
        error::MetricsError,
    };
    use std::{panic, sync::Arc, time::Duration};

    fn timer(buckets: Vec<f64>) -> (Timer, Arc<Mock>) {
        let (clock, mock) = Clock::mock();
        let reservoir = DecayingReservoir::new(reservoir::DEFAULT_SIZE, reservoir::DEFAULT_ALPHA, 0);
        (Timer::new("t".to_owned(), clock, reservoir, default_percentiles(), buckets), mock)
    }

    #[test]
    fn test_timer_update() {
        let (timer, _) = timer(Vec::new());
        timer.update(Duration::from_millis(10)).unwrap();
        timer.update(Duration::from_millis(30)).unwrap();

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.elapsed_time(), Duration::from_millis(40));

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.min(), 10_000_000.0);
        assert_eq!(snapshot.max(), 30_000_000.0);
        assert_eq!(snapshot.mean(), 20_000_000.0);
    }

    #[test]
    fn test_context_stop_is_one_shot() {
        let (timer, mock) = timer(Vec::new());
        let mut context = timer.time();
        mock.increment(Duration::from_millis(250));

        let first = context.stop().unwrap();
        mock.increment(Duration::from_millis(250));
        let second = context.stop().unwrap();
        drop(context);

        assert_eq!(first, Duration::from_millis(250));
        assert_eq!(second, first);
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.elapsed_time(), Duration::from_millis(250));
    }

    #[test]
    fn test_dropped_context_records() {
        let (timer, mock) = timer(Vec::new());
        {
            let _context = timer.time();
            mock.increment(Duration::from_millis(5));
        }
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.snapshot().max(), 5_000_000.0);
    }

    #[test]
    fn test_time_fn_records_on_panic() {
        let (timer, mock) = timer(Vec::new());
        let value = timer
            .time_fn(|| {
                mock.increment(Duration::from_millis(3));
                7
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(timer.count(), 1);

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            timer.time_fn(|| {
                mock.increment(Duration::from_millis(4));
                panic!("boom");
            })
        }));
        assert!(result.is_err());
        assert_eq!(timer.count(), 2);
        assert_eq!(timer.elapsed_time(), Duration::from_millis(7));
    }

    #[test]
    fn test_timer_buckets_in_nanos() {
        let (timer, _) = timer(vec![1_000_000.0, 1_000_000_000.0]);
        timer.update(Duration::from_micros(500)).unwrap();
        timer.update(Duration::from_millis(500)).unwrap();
        timer.update(Duration::from_secs(2)).unwrap();

        let counts: Vec<u64> = timer.snapshot().buckets().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_timer_detached() {
        let (timer, _) = timer(Vec::new());
        timer.attachment.detach();
        assert_eq!(
            timer.update(Duration::from_millis(1)),
            Err(MetricsError::DetachedMetric("t".to_owned()))
        );
        assert!(timer.time_fn(|| ()).is_err());
        assert!(timer.time().stop().is_err());
        assert_eq!(timer.count(), 0);
    }

    #[test]
    fn test_failed_stop_stays_failed() {
        let (timer, mock) = timer(Vec::new());
        let mut context = timer.time();
        mock.increment(Duration::from_millis(5));
        timer.attachment.detach();

        let first = context.stop();
        let second = context.stop();
        assert_eq!(first, Err(MetricsError::DetachedMetric("t".to_owned())));
        assert_eq!(second, first);
        assert_eq!(timer.count(), 0);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let (timer, _) = timer(Vec::new());
        timer.update(Duration::from_secs(u64::MAX)).unwrap();
        timer.update(Duration::from_secs(1)).unwrap();

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.elapsed_time(), Duration::from_nanos(u64::MAX));
        assert_eq!(timer.snapshot().max(), u64::MAX as f64);
    }
}

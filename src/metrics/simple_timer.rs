use crate::{
    clock::Clock,
    data::MinuteWindow,
    error::Result,
    metrics::{
        timer::{accumulate, saturating_nanos, Context, Recorder},
        Attachment,
    },
};
use std::{
    convert::TryFrom,
    sync::atomic::{AtomicI64, AtomicU64, Ordering},
    time::Duration,
};

/// Count and total of durations, with the extremes of the previous complete minute.
pub struct SimpleTimer {
    pub(crate) attachment: Attachment,
    clock: Clock,
    count: AtomicI64,
    elapsed: AtomicU64,
    window: MinuteWindow,
}

impl SimpleTimer {
    pub(crate) fn new(name: String, clock: Clock) -> SimpleTimer {
        SimpleTimer {
            attachment: Attachment::new(name),
            window: MinuteWindow::new(clock.clone(), None),
            clock,
            count: AtomicI64::new(0),
            elapsed: AtomicU64::new(0),
        }
    }

    /// Records a duration.
    pub fn update(&self, duration: Duration) -> Result<()> {
        self.attachment.check()?;
        let nanos = saturating_nanos(duration);
        self.count.fetch_add(1, Ordering::Relaxed);
        accumulate(&self.elapsed, nanos);
        self.window.observe(i64::try_from(nanos).unwrap_or(i64::MAX), None);
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

    pub fn count(&self) -> i64 { self.count.load(Ordering::Relaxed) }

    /// Sum of every duration recorded.
    pub fn elapsed_time(&self) -> Duration { Duration::from_nanos(self.elapsed.load(Ordering::Relaxed)) }

    /// Shortest duration of the previous complete minute.
    pub fn min_time_duration(&self) -> Option<Duration> {
        self.window.previous(None).map(|e| Duration::from_nanos(e.min as u64))
    }

    /// Longest duration of the previous complete minute.
    pub fn max_time_duration(&self) -> Option<Duration> {
        self.window.previous(None).map(|e| Duration::from_nanos(e.max as u64))
    }
}

impl Recorder for SimpleTimer {
    fn clock(&self) -> &Clock { &self.clock }

    fn record(&self, duration: Duration) -> Result<()> { self.update(duration) }
}

#[cfg(test)]
mod tests {
    use super::SimpleTimer;
    use crate::{clock::Clock, error::MetricsError};
    use std::time::Duration;

    #[test]
    fn test_simple_timer_totals() {
        let (clock, mock) = Clock::mock();
        let timer = SimpleTimer::new("s".to_owned(), clock);

        timer.update(Duration::from_millis(2)).unwrap();
        {
            let _context = timer.time();
            mock.increment(Duration::from_millis(3));
        }

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.elapsed_time(), Duration::from_millis(5));
    }

    #[test]
    fn test_simple_timer_minute_extremes() {
        let (clock, mock) = Clock::mock();
        let timer = SimpleTimer::new("s".to_owned(), clock);

        timer.update(Duration::from_millis(4)).unwrap();
        timer.update(Duration::from_millis(1)).unwrap();
        timer.update(Duration::from_millis(9)).unwrap();
        assert_eq!(timer.max_time_duration(), None);
        assert_eq!(timer.min_time_duration(), None);

        mock.increment(Duration::from_secs(60));
        assert_eq!(timer.max_time_duration(), Some(Duration::from_millis(9)));
        assert_eq!(timer.min_time_duration(), Some(Duration::from_millis(1)));

        // A minute without samples reports nothing.
        mock.increment(Duration::from_secs(60));
        assert_eq!(timer.max_time_duration(), None);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let (clock, mock) = Clock::mock();
        let timer = SimpleTimer::new("s".to_owned(), clock);
        timer.update(Duration::from_secs(u64::MAX)).unwrap();
        timer.update(Duration::from_secs(1)).unwrap();
        assert_eq!(timer.elapsed_time(), Duration::from_nanos(u64::MAX));

        mock.increment(Duration::from_secs(60));
        assert_eq!(timer.max_time_duration(), Some(Duration::from_nanos(i64::MAX as u64)));
        assert_eq!(timer.min_time_duration(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_simple_timer_detached() {
        let (clock, _) = Clock::mock();
        let timer = SimpleTimer::new("s".to_owned(), clock);
        timer.attachment.detach();
        assert_eq!(
            timer.update(Duration::from_millis(1)),
            Err(MetricsError::DetachedMetric("s".to_owned()))
        );
        assert_eq!(timer.count(), 0);
    }
}

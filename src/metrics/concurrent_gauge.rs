use crate::{clock::Clock, data::MinuteWindow, error::Result, metrics::Attachment};
use std::sync::atomic::{AtomicI64, Ordering};

/// Number of in-flight invocations, with the extremes reached during the previous complete minute.
pub struct ConcurrentGauge {
    pub(crate) attachment: Attachment,
    count: AtomicI64,
    window: MinuteWindow,
}

impl ConcurrentGauge {
    pub(crate) fn new(name: String, clock: Clock) -> ConcurrentGauge {
        ConcurrentGauge {
            attachment: Attachment::new(name),
            count: AtomicI64::new(0),
            window: MinuteWindow::new(clock, Some(0)),
        }
    }

    pub fn inc(&self) -> Result<()> { self.add(1) }

    pub fn dec(&self) -> Result<()> { self.add(-1) }

    /// Live count.
    pub fn count(&self) -> i64 { self.count.load(Ordering::Acquire) }

    /// Lowest count of the previous complete minute, `None` before the first minute elapses.
    pub fn min(&self) -> Option<i64> { self.window.previous(Some(self.count())).map(|e| e.min) }

    /// Highest count of the previous complete minute, `None` before the first minute elapses.
    pub fn max(&self) -> Option<i64> { self.window.previous(Some(self.count())).map(|e| e.max) }

    fn add(&self, delta: i64) -> Result<()> {
        self.attachment.check()?;
        let before = self.count.fetch_add(delta, Ordering::AcqRel);
        self.window.observe(before + delta, Some(before));
        Ok(())
    }
}

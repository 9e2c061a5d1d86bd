use crate::{
    error::{MetricsError, Result},
    metrics::Attachment,
};
use std::sync::atomic::{AtomicI64, Ordering};

/// A counter of events.
///
/// Monotonic counters only move up; others accept negative deltas.
pub struct Counter {
    pub(crate) attachment: Attachment,
    monotonic: bool,
    count: AtomicI64,
}

impl Counter {
    pub(crate) fn new(name: String, monotonic: bool) -> Counter {
        Counter {
            attachment: Attachment::new(name),
            monotonic,
            count: AtomicI64::new(0),
        }
    }

    /// Increments the counter by one.
    pub fn inc(&self) -> Result<()> { self.inc_by(1) }

    /// Adds `delta` to the counter.
    pub fn inc_by(&self, delta: i64) -> Result<()> {
        self.attachment.check()?;
        if self.monotonic && delta < 0 {
            return Err(MetricsError::InvalidArgument(format!(
                "monotonic counter cannot be incremented by {}",
                delta
            )));
        }

        self.count.fetch_add(delta, Ordering::Relaxed);
        Ok(())
    }

    pub fn count(&self) -> i64 { self.count.load(Ordering::Relaxed) }

    pub fn is_monotonic(&self) -> bool { self.monotonic }
}

use crate::clock::ClockSource;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// A clock source that only moves when told to.
pub struct Mock {
    offset: AtomicU64,
}

impl Mock {
    pub fn new(offset: u64) -> Self { Self { offset: AtomicU64::new(offset) } }

    /// Advances the clock.
    pub fn increment(&self, amount: Duration) { self.offset.fetch_add(amount.as_nanos() as u64, Ordering::Release); }

    /// Moves the clock to an absolute reading.
    pub fn set(&self, nanos: u64) { self.offset.store(nanos, Ordering::Release); }
}

impl ClockSource for Mock {
    fn now(&self) -> u64 { self.offset.load(Ordering::Acquire) }
}

use std::{fmt, sync::Arc, time::Duration};

mod mock;
pub use self::mock::Mock;
mod system;
pub use self::system::System;

/// Nanoseconds in one minute, the width of a rollover window.
pub(crate) const NANOS_PER_MINUTE: u64 = 60 * 1_000_000_000;

/// A source of wall-clock time.
///
/// Readings are nanoseconds since the Unix epoch.  Minute-aligned windows are derived from these
/// readings, so a source must not jump backwards under normal operation.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> u64;
}

impl<T: ClockSource> ClockSource for Arc<T> {
    fn now(&self) -> u64 { (**self).now() }
}

/// Cloneable handle to the time source shared by a registry and its metrics.
#[derive(Clone)]
pub struct Clock {
    source: Arc<dyn ClockSource>,
}

impl Clock {
    /// Creates a clock backed by the system wall clock.
    pub fn new() -> Clock { Clock::from_source(System::new()) }

    /// Creates a clock backed by an arbitrary source.
    pub fn from_source<S: ClockSource + 'static>(source: S) -> Clock {
        Clock { source: Arc::new(source) }
    }

    /// Creates a clock backed by a manually advanced [`Mock`].
    ///
    /// The returned handle is used to move time forward.
    pub fn mock() -> (Clock, Arc<Mock>) {
        let mock = Arc::new(Mock::new(0));
        (Clock::from_source(mock.clone()), mock)
    }

    /// Current time in nanoseconds since the Unix epoch.
    pub fn now(&self) -> u64 { self.source.now() }

    /// Index of the wall-clock minute containing `now()`.
    pub fn minute(&self) -> u64 { self.now() / NANOS_PER_MINUTE }

    /// Time elapsed between two readings, saturating at zero.
    pub fn delta(&self, start: u64, end: u64) -> Duration { Duration::from_nanos(end.saturating_sub(start)) }
}

impl Default for Clock {
    fn default() -> Clock { Clock::new() }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.debug_struct("Clock").field("now", &self.now()).finish() }
}

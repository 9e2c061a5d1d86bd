//! Helpers for driving metrics around a unit of work.
//!
//! Each wrapper resolves its metric through the registry on every call, so a metric removed in
//! the meantime is simply recreated.  Timing and concurrency tracking survive a panicking
//! closure: the measurement or decrement happens while unwinding.
use crate::{error::Result, registry::MetricRegistry, tag::Tag};

/// Resolves the name of a metric attached to `member` of `declaring_type`.
///
/// An explicit name replaces the member name.  Relative names are prefixed with the declaring
/// type, absolute ones are used as is.
pub fn metric_name(declaring_type: &str, member: &str, explicit: Option<&str>, absolute: bool) -> String {
    let local = match explicit {
        Some(name) if !name.is_empty() => name,
        _ => member,
    };

    if absolute || declaring_type.is_empty() {
        local.to_owned()
    } else {
        format!("{}.{}", declaring_type, local)
    }
}

/// Increments a counter, then runs `f`.
pub fn counted<F, R>(registry: &MetricRegistry, name: &str, tags: &[Tag], f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    registry.counter(name, tags)?.inc()?;
    Ok(f())
}

/// Marks a meter, then runs `f`.
pub fn metered<F, R>(registry: &MetricRegistry, name: &str, tags: &[Tag], f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    registry.meter(name, tags)?.mark()?;
    Ok(f())
}

/// Runs `f`, recording its duration in a timer.
pub fn timed<F, R>(registry: &MetricRegistry, name: &str, tags: &[Tag], f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    registry.timer(name, tags)?.time_fn(f)
}

/// Runs `f`, recording its duration in a simple timer.
pub fn simply_timed<F, R>(registry: &MetricRegistry, name: &str, tags: &[Tag], f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    registry.simple_timer(name, tags)?.time_fn(f)
}

/// Runs `f` while counted as in flight by a concurrent gauge.
pub fn concurrent<F, R>(registry: &MetricRegistry, name: &str, tags: &[Tag], f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    let gauge = registry.concurrent_gauge(name, tags)?;
    gauge.inc()?;
    let _guard = InFlight(&gauge);
    Ok(f())
}

struct InFlight<'a>(&'a crate::metrics::ConcurrentGauge);

impl<'a> Drop for InFlight<'a> {
    fn drop(&mut self) { let _ = self.0.dec(); }
}

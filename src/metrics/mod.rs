use crate::{
    error::{MetricsError, Result},
    metadata::MetricKind,
};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

mod concurrent_gauge;
mod counter;
mod gauge;
mod histogram;
mod meter;
mod simple_timer;
mod timer;

pub use self::{
    concurrent_gauge::ConcurrentGauge,
    counter::Counter,
    gauge::Gauge,
    histogram::Histogram,
    meter::Meter,
    simple_timer::SimpleTimer,
    timer::{Context, Timer},
};

/// Whether a metric still belongs to its registry.
///
/// Once detached, mutators fail with [`MetricsError::DetachedMetric`].
pub(crate) struct Attachment {
    name: String,
    attached: AtomicBool,
}

impl Attachment {
    pub(crate) fn new(name: String) -> Attachment {
        Attachment {
            name,
            attached: AtomicBool::new(true),
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.attached.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(MetricsError::DetachedMetric(self.name.clone()))
        }
    }

    pub(crate) fn detach(&self) { self.attached.store(false, Ordering::Release); }

    pub(crate) fn is_attached(&self) -> bool { self.attached.load(Ordering::Acquire) }
}

/// A registered metric of any kind.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    SimpleTimer(Arc<SimpleTimer>),
    ConcurrentGauge(Arc<ConcurrentGauge>),
}

macro_rules! accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        /// Returns the metric if it is of this kind.
        pub fn $fn_name(&self) -> Option<&Arc<$ty>> {
            match self {
                Metric::$variant(m) => Some(m),
                _ => None,
            }
        }
    };
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer(_) => MetricKind::Timer,
            Metric::SimpleTimer(_) => MetricKind::SimpleTimer,
            Metric::ConcurrentGauge(_) => MetricKind::ConcurrentGauge,
        }
    }

    accessor!(as_counter, Counter, Counter);
    accessor!(as_gauge, Gauge, Gauge);
    accessor!(as_histogram, Histogram, Histogram);
    accessor!(as_meter, Meter, Meter);
    accessor!(as_timer, Timer, Timer);
    accessor!(as_simple_timer, SimpleTimer, SimpleTimer);
    accessor!(as_concurrent_gauge, ConcurrentGauge, ConcurrentGauge);

    /// Whether the metric is still held by its registry.
    pub fn is_attached(&self) -> bool { self.attachment().is_attached() }

    /// Whether both values refer to the same instance.
    pub fn ptr_eq(&self, other: &Metric) -> bool {
        match (self, other) {
            (Metric::Counter(a), Metric::Counter(b)) => Arc::ptr_eq(a, b),
            (Metric::Gauge(a), Metric::Gauge(b)) => Arc::ptr_eq(a, b),
            (Metric::Histogram(a), Metric::Histogram(b)) => Arc::ptr_eq(a, b),
            (Metric::Meter(a), Metric::Meter(b)) => Arc::ptr_eq(a, b),
            (Metric::Timer(a), Metric::Timer(b)) => Arc::ptr_eq(a, b),
            (Metric::SimpleTimer(a), Metric::SimpleTimer(b)) => Arc::ptr_eq(a, b),
            (Metric::ConcurrentGauge(a), Metric::ConcurrentGauge(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn detach(&self) { self.attachment().detach() }

    fn attachment(&self) -> &Attachment {
        match self {
            Metric::Counter(m) => &m.attachment,
            Metric::Gauge(m) => &m.attachment,
            Metric::Histogram(m) => &m.attachment,
            Metric::Meter(m) => &m.attachment,
            Metric::Timer(m) => &m.attachment,
            Metric::SimpleTimer(m) => &m.attachment,
            Metric::ConcurrentGauge(m) => &m.attachment,
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Metric")
            .field("kind", &self.kind())
            .field("attached", &self.is_attached())
            .finish()
    }
}

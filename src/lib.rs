mod clock;
mod configuration;
mod data;
mod error;
mod id;
mod metadata;
mod metrics;
mod registry;
mod tag;

pub mod distribution;
pub mod global;
pub mod instrument;
pub mod source;

pub use self::{
    clock::{Clock, ClockSource, Mock, System},
    configuration::Configuration,
    data::{default_percentiles, BucketCount, Percentile, PercentileValue, Snapshot},
    error::{MetricsError, Result},
    id::MetricId,
    metadata::{Metadata, MetadataBuilder, MetricKind, MetricUnits},
    metrics::{ConcurrentGauge, Context, Counter, Gauge, Histogram, Meter, Metric, SimpleTimer, Timer},
    registry::{init, registries, MetricRegistry, Registries, RegistryType, Scope},
    tag::Tag,
};

pub mod buckets;
pub mod ewma;
pub mod rate;
pub mod reservoir;
pub mod snapshot;
pub mod window;

pub(crate) use self::{buckets::Buckets, rate::Rates, reservoir::DecayingReservoir, window::MinuteWindow};
pub use self::snapshot::{default_percentiles, BucketCount, Percentile, PercentileValue, Snapshot};

use serde::Serialize;
use std::fmt;

/// Well-known unit names.
pub struct MetricUnits;

impl MetricUnits {
    pub const NONE: &'static str = "none";
    pub const NANOSECONDS: &'static str = "nanoseconds";
    pub const MICROSECONDS: &'static str = "microseconds";
    pub const MILLISECONDS: &'static str = "milliseconds";
    pub const SECONDS: &'static str = "seconds";
    pub const MINUTES: &'static str = "minutes";
    pub const HOURS: &'static str = "hours";
    pub const BYTES: &'static str = "bytes";
    pub const KILOBYTES: &'static str = "kilobytes";
    pub const MEGABYTES: &'static str = "megabytes";
    pub const PERCENT: &'static str = "percent";
    pub const PER_SECOND: &'static str = "per_second";
}

/// The kind of a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
    SimpleTimer,
    ConcurrentGauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
            MetricKind::SimpleTimer => "simple timer",
            MetricKind::ConcurrentGauge => "concurrent gauge",
        }
    }

    /// Unit assumed when none is given.
    pub fn default_unit(self) -> &'static str {
        match self {
            MetricKind::Timer | MetricKind::SimpleTimer => MetricUnits::NANOSECONDS,
            _ => MetricUnits::NONE,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Descriptive information shared by every metric registered under one name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Metadata {
    name: String,
    display_name: Option<String>,
    description: String,
    unit: String,
    kind: MetricKind,
    monotonic: bool,
}

impl Metadata {
    /// Starts building metadata for `name`.
    pub fn builder<N: Into<String>>(name: N) -> MetadataBuilder {
        MetadataBuilder {
            name: name.into(),
            display_name: None,
            description: None,
            unit: None,
            kind: None,
            monotonic: true,
        }
    }

    /// Metadata with no description and the default unit for `kind`.
    pub fn of<N: Into<String>>(name: N, kind: MetricKind) -> Metadata { Metadata::builder(name).kind(kind).build() }

    pub fn name(&self) -> &str { &self.name }

    /// Display name, falling back to the metric name.
    pub fn display_name(&self) -> &str { self.display_name.as_ref().unwrap_or(&self.name) }

    pub fn description(&self) -> &str { &self.description }

    pub fn unit(&self) -> &str { &self.unit }

    pub fn kind(&self) -> MetricKind { self.kind }

    /// Whether a counter refuses negative deltas.  Always `false` for other kinds.
    pub fn is_monotonic(&self) -> bool { self.kind == MetricKind::Counter && self.monotonic }

    // Forces the kind, carrying a defaulted unit over to the new kind's default.
    pub(crate) fn with_kind(mut self, kind: MetricKind) -> Metadata {
        if self.kind != kind && self.unit == self.kind.default_unit() {
            self.unit = kind.default_unit().to_owned();
        }
        self.kind = kind;
        self
    }

    /// Explains why `other` cannot share a name with `self`, if it cannot.
    pub(crate) fn conflict_with(&self, other: &Metadata) -> Option<String> {
        if self.kind != other.kind {
            return Some(format!("kind {} differs from registered {}", other.kind, self.kind));
        }
        if self.description != other.description {
            return Some(format!(
                "description {:?} differs from registered {:?}",
                other.description, self.description
            ));
        }
        if self.unit != other.unit {
            return Some(format!("unit {:?} differs from registered {:?}", other.unit, self.unit));
        }
        if self.is_monotonic() != other.is_monotonic() {
            return Some("monotonicity differs from registered counter".to_owned());
        }
        None
    }
}

/// Builder for [`Metadata`].
#[derive(Clone, Debug)]
pub struct MetadataBuilder {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    unit: Option<String>,
    kind: Option<MetricKind>,
    monotonic: bool,
}

impl MetadataBuilder {
    pub fn display_name<S: Into<String>>(mut self, display_name: S) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the metric kind.
    ///
    /// Typed registry accessors overwrite this with their own kind.
    pub fn kind(mut self, kind: MetricKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Whether a counter refuses negative deltas.
    ///
    /// Defaults to `true`.
    pub fn monotonic(mut self, monotonic: bool) -> Self {
        self.monotonic = monotonic;
        self
    }

    pub fn build(self) -> Metadata {
        let kind = self.kind.unwrap_or(MetricKind::Counter);
        Metadata {
            name: self.name,
            display_name: self.display_name,
            description: self.description.unwrap_or_default(),
            unit: self.unit.unwrap_or_else(|| kind.default_unit().to_owned()),
            kind,
            monotonic: self.monotonic,
        }
    }
}

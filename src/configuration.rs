use crate::{
    clock::Clock,
    data::{default_percentiles, reservoir, Percentile},
    distribution::DistributionConfig,
    global::GlobalTags,
    registry::Registries,
    source::{ConfigSource, EnvSource, MapSource},
};

/// A configuration builder for [`Registries`].
#[derive(Clone, Debug)]
pub struct Configuration {
    pub(crate) reservoir_size: usize,
    pub(crate) reservoir_alpha: f64,
    pub(crate) percentiles: Vec<Percentile>,
    pub(crate) global_tags: GlobalTags,
    pub(crate) distribution: DistributionConfig,
    pub(crate) clock: Clock,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            reservoir_size: reservoir::DEFAULT_SIZE,
            reservoir_alpha: reservoir::DEFAULT_ALPHA,
            percentiles: default_percentiles(),
            global_tags: GlobalTags::empty(),
            distribution: DistributionConfig::new(),
            clock: Clock::new(),
        }
    }
}

impl Configuration {
    /// Creates a new `Configuration` with default values.
    pub fn new() -> Configuration { Default::default() }

    /// Creates a `Configuration` from the process environment.
    ///
    /// Global tags come from `MP_METRICS_TAGS`, and distribution overrides from the environment
    /// spellings of their property names.
    pub fn from_env() -> Configuration { Configuration::from_sources(&EnvSource, &MapSource::new()) }

    /// Creates a `Configuration` from an environment source and a configuration source.
    ///
    /// For global tags the configuration source wins key by key.  Distribution overrides are read
    /// from the configuration source when it defines any, otherwise from the environment.
    pub fn from_sources(env: &dyn ConfigSource, config: &dyn ConfigSource) -> Configuration {
        let global_tags = GlobalTags::resolve(env, config);

        let from_config = DistributionConfig::from_source(config);
        let distribution = if from_config.is_empty() {
            DistributionConfig::from_source(env)
        } else {
            from_config
        };

        Configuration::new().global_tags(global_tags).distribution(distribution)
    }

    /// Sets the number of values each reservoir retains.
    ///
    /// Defaults to `1028`.
    pub fn reservoir_size(mut self, size: usize) -> Self {
        self.reservoir_size = size;
        self
    }

    /// Sets the reservoir decay factor.
    ///
    /// Defaults to `0.015`.  Higher values bias snapshots more strongly towards recent values.
    pub fn reservoir_alpha(mut self, alpha: f64) -> Self {
        self.reservoir_alpha = alpha;
        self
    }

    /// Sets the percentiles reported when no override applies.
    ///
    /// Defaults to `0.5, 0.75, 0.95, 0.98, 0.99, 0.999`.
    pub fn percentiles(mut self, percentiles: Vec<Percentile>) -> Self {
        self.percentiles = percentiles;
        self
    }

    /// Sets the tags appended to every metric id.
    pub fn global_tags(mut self, global_tags: GlobalTags) -> Self {
        self.global_tags = global_tags;
        self
    }

    /// Sets per-metric percentile and bucket overrides.
    pub fn distribution(mut self, distribution: DistributionConfig) -> Self {
        self.distribution = distribution;
        self
    }

    /// Sets the time source.
    ///
    /// Defaults to the system wall clock; tests substitute [`Clock::mock`].
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Create a [`Registries`] based on this configuration.
    pub fn build(self) -> Registries { Registries::from_config(self) }
}

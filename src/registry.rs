use crate::{
    configuration::Configuration,
    data::DecayingReservoir,
    error::{MetricsError, Result},
    global::GlobalTags,
    id::MetricId,
    metadata::{Metadata, MetricKind},
    metrics::{ConcurrentGauge, Counter, Gauge, Histogram, Meter, Metric, SimpleTimer, Timer},
    tag::Tag,
};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use log::{debug, info};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::{fmt, str::FromStr, sync::Arc};

static REGISTRIES: OnceCell<Registries> = OnceCell::new();

/// Installs the process-wide registries.
///
/// Returns `false` if they were already installed, either by an earlier call or lazily by
/// [`registries`]; the given configuration is then discarded.
pub fn init(config: Configuration) -> bool {
    let installed = REGISTRIES.set(config.build()).is_ok();
    if installed {
        info!("process-wide metric registries initialized");
    }
    installed
}

/// The process-wide registries, initialized from the environment on first use if [`init`] was
/// never called.
pub fn registries() -> &'static Registries { REGISTRIES.get_or_init(|| Configuration::from_env().build()) }

/// A registry partition.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Base,
    Vendor,
    Application,
    Custom(String),
}

impl Scope {
    /// Parses a scope name.  Names other than `base`, `vendor` and `application` are custom scopes.
    pub fn parse(name: &str) -> Result<Scope> {
        match name.trim() {
            "" => Err(MetricsError::InvalidScope),
            "base" => Ok(Scope::Base),
            "vendor" => Ok(Scope::Vendor),
            "application" => Ok(Scope::Application),
            other => Ok(Scope::Custom(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scope::Base => "base",
            Scope::Vendor => "vendor",
            Scope::Application => "application",
            Scope::Custom(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Scope {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Scope> { Scope::parse(s) }
}

/// The fixed registry types that predate custom scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistryType {
    Base,
    Vendor,
    Application,
}

impl From<RegistryType> for Scope {
    fn from(t: RegistryType) -> Scope {
        match t {
            RegistryType::Base => Scope::Base,
            RegistryType::Vendor => Scope::Vendor,
            RegistryType::Application => Scope::Application,
        }
    }
}

/// One registry per scope, created on first use.
pub struct Registries {
    config: Arc<Configuration>,
    registries: RwLock<HashMap<Scope, Arc<MetricRegistry>, FnvBuildHasher>>,
}

impl Registries {
    /// Gets a builder to configure a `Registries` instance with.
    pub fn builder() -> Configuration { Configuration::default() }

    pub(crate) fn from_config(config: Configuration) -> Registries {
        Registries {
            config: Arc::new(config),
            registries: RwLock::new(HashMap::default()),
        }
    }

    /// Gets the registry for `scope`, creating it if needed.
    ///
    /// Equal scopes always yield the same registry, however they were obtained.
    pub fn get<S: Into<Scope>>(&self, scope: S) -> Arc<MetricRegistry> {
        let scope = scope.into();
        if let Some(registry) = self.registries.read().get(&scope) {
            return registry.clone();
        }

        self.registries
            .write()
            .entry(scope.clone())
            .or_insert_with(|| {
                debug!("creating {} registry", scope);
                Arc::new(MetricRegistry::new(scope, self.config.clone()))
            })
            .clone()
    }

    /// Gets the registry for a scope given by name.
    pub fn scope(&self, name: &str) -> Result<Arc<MetricRegistry>> { Scope::parse(name).map(|s| self.get(s)) }

    pub fn base(&self) -> Arc<MetricRegistry> { self.get(Scope::Base) }

    pub fn vendor(&self) -> Arc<MetricRegistry> { self.get(Scope::Vendor) }

    pub fn application(&self) -> Arc<MetricRegistry> { self.get(Scope::Application) }

    /// Scopes whose registries exist, in order.
    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.registries.read().keys().cloned().collect();
        scopes.sort();
        scopes
    }

    pub fn global_tags(&self) -> &GlobalTags { &self.config.global_tags }
}

impl fmt::Debug for Registries {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.debug_struct("Registries").field("scopes", &self.scopes()).finish() }
}

struct NameEntry {
    metadata: Metadata,
    tag_keys: Vec<String>,
    ids: usize,
}

#[derive(Default)]
struct State {
    metrics: HashMap<MetricId, Metric, FnvBuildHasher>,
    names: HashMap<String, NameEntry, FnvBuildHasher>,
}

macro_rules! accessors {
    ($kind:ident, $ty:ident, $as_fn:ident, $make:ident, $plain:ident, $with:ident, $get:ident) => {
        /// Gets or creates the metric with default metadata.
        ///
        /// An existing registration under the same name is reused as long as its kind matches.
        pub fn $plain(&self, name: &str, tags: &[Tag]) -> Result<Arc<$ty>> {
            let metadata = Metadata::of(name, MetricKind::$kind);
            let metric = self.get_or_create(metadata, false, tags, |id, md| self.$make(id, md))?;
            typed(metric.$as_fn(), name, &metric)
        }

        /// Gets or creates the metric, requiring `metadata` to match any existing registration.
        pub fn $with(&self, metadata: Metadata, tags: &[Tag]) -> Result<Arc<$ty>> {
            let metadata = metadata.with_kind(MetricKind::$kind);
            let name = metadata.name().to_owned();
            let metric = self.get_or_create(metadata, true, tags, |id, md| self.$make(id, md))?;
            typed(metric.$as_fn(), &name, &metric)
        }

        /// Looks up an existing metric without creating it.
        pub fn $get(&self, id: &MetricId) -> Option<Arc<$ty>> { self.get_metric(id).and_then(|m| m.$as_fn().cloned()) }
    };
}

/// Metrics of one scope, keyed by [`MetricId`].
///
/// Registration takes a write lock to validate and insert atomically; lookups of existing
/// metrics take a read lock.  Updates to a metric never touch the registry.
pub struct MetricRegistry {
    scope: Scope,
    config: Arc<Configuration>,
    state: RwLock<State>,
}

impl MetricRegistry {
    pub(crate) fn new(scope: Scope, config: Arc<Configuration>) -> MetricRegistry {
        MetricRegistry {
            scope,
            config,
            state: RwLock::new(State::default()),
        }
    }

    pub fn scope(&self) -> &Scope { &self.scope }

    accessors!(Counter, Counter, as_counter, make_counter, counter, counter_with, get_counter);
    accessors!(Histogram, Histogram, as_histogram, make_histogram, histogram, histogram_with, get_histogram);
    accessors!(Meter, Meter, as_meter, make_meter, meter, meter_with, get_meter);
    accessors!(Timer, Timer, as_timer, make_timer, timer, timer_with, get_timer);
    accessors!(SimpleTimer, SimpleTimer, as_simple_timer, make_simple_timer, simple_timer, simple_timer_with, get_simple_timer);
    accessors!(
        ConcurrentGauge,
        ConcurrentGauge,
        as_concurrent_gauge,
        make_concurrent_gauge,
        concurrent_gauge,
        concurrent_gauge_with,
        get_concurrent_gauge
    );

    /// Gets or creates a gauge reading from `supplier`.
    ///
    /// If the gauge already exists it is returned as is and `supplier` is dropped.
    pub fn gauge<F>(&self, name: &str, tags: &[Tag], supplier: F) -> Result<Arc<Gauge>>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let metadata = Metadata::of(name, MetricKind::Gauge);
        let metric = self.get_or_create(metadata, false, tags, |id, _| {
            Metric::Gauge(Arc::new(Gauge::new(id.to_string(), supplier)))
        })?;
        typed(metric.as_gauge(), name, &metric)
    }

    /// Gets or creates a gauge, requiring `metadata` to match any existing registration.
    pub fn gauge_with<F>(&self, metadata: Metadata, tags: &[Tag], supplier: F) -> Result<Arc<Gauge>>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let metadata = metadata.with_kind(MetricKind::Gauge);
        let name = metadata.name().to_owned();
        let metric = self.get_or_create(metadata, true, tags, |id, _| {
            Metric::Gauge(Arc::new(Gauge::new(id.to_string(), supplier)))
        })?;
        typed(metric.as_gauge(), &name, &metric)
    }

    /// Looks up an existing gauge without creating it.
    pub fn get_gauge(&self, id: &MetricId) -> Option<Arc<Gauge>> { self.get_metric(id).and_then(|m| m.as_gauge().cloned()) }

    /// Looks up an existing metric of any kind.
    ///
    /// Global tags are applied to `id` before the lookup.
    pub fn get_metric(&self, id: &MetricId) -> Option<Metric> {
        let id = self.qualify(id);
        self.state.read().metrics.get(&id).cloned()
    }

    /// Metadata registered under `name`.
    pub fn metadata(&self, name: &str) -> Option<Metadata> { self.state.read().names.get(name).map(|n| n.metadata.clone()) }

    /// All registered ids, in order.
    pub fn metric_ids(&self) -> Vec<MetricId> {
        let mut ids: Vec<MetricId> = self.state.read().metrics.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All registered names, in order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().names.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered metrics, ordered by id.
    pub fn metrics(&self) -> Vec<(MetricId, Metric)> { self.query(|_, _| true) }

    /// Metrics whose id and metadata satisfy `filter`, ordered by id.
    pub fn query<F>(&self, filter: F) -> Vec<(MetricId, Metric)>
    where
        F: Fn(&MetricId, &Metadata) -> bool,
    {
        let state = self.state.read();
        let mut matched: Vec<(MetricId, Metric)> = state
            .metrics
            .iter()
            .filter(|(id, _)| {
                state
                    .names
                    .get(id.name())
                    .map_or(false, |entry| filter(*id, &entry.metadata))
            })
            .map(|(id, metric)| (id.clone(), metric.clone()))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        matched
    }

    pub fn len(&self) -> usize { self.state.read().metrics.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Removes one metric.  Handles to it fail on their next update.
    pub fn remove(&self, id: &MetricId) -> bool {
        let id = self.qualify(id);
        let mut state = self.state.write();
        self.remove_locked(&mut state, &id)
    }

    /// Removes every metric registered under `name`, whatever its tags.
    pub fn remove_name(&self, name: &str) -> bool { self.remove_matching(|id, _| id.name() == name) > 0 }

    /// Removes every metric satisfying `filter`, returning how many were removed.
    pub fn remove_matching<F>(&self, filter: F) -> usize
    where
        F: Fn(&MetricId, &Metadata) -> bool,
    {
        let mut state = self.state.write();
        let doomed: Vec<MetricId> = state
            .metrics
            .keys()
            .filter(|id| {
                state
                    .names
                    .get(id.name())
                    .map_or(false, |entry| filter(*id, &entry.metadata))
            })
            .cloned()
            .collect();

        for id in &doomed {
            self.remove_locked(&mut state, id);
        }
        doomed.len()
    }

    fn get_or_create<F>(&self, metadata: Metadata, explicit: bool, tags: &[Tag], create: F) -> Result<Metric>
    where
        F: FnOnce(&MetricId, &Metadata) -> Metric,
    {
        for tag in tags {
            tag.validate()?;
        }
        let id = MetricId::new(metadata.name(), tags.iter().cloned()).with_tags(self.config.global_tags.tags());

        {
            let state = self.state.read();
            if let Some(metric) = state.metrics.get(&id) {
                if let Some(entry) = state.names.get(id.name()) {
                    check_compatible(entry, &metadata, explicit)?;
                }
                return Ok(metric.clone());
            }
        }

        let mut state = self.state.write();
        // Another thread may have registered it while we waited for the lock.
        if let Some(metric) = state.metrics.get(&id) {
            if let Some(entry) = state.names.get(id.name()) {
                check_compatible(entry, &metadata, explicit)?;
            }
            return Ok(metric.clone());
        }

        let tag_keys = id.tag_keys();
        let metadata = match state.names.get(id.name()) {
            Some(entry) => {
                check_compatible(entry, &metadata, explicit)?;
                if entry.tag_keys != tag_keys {
                    return Err(MetricsError::TagKeySetConflict {
                        name: id.name().to_owned(),
                        expected: entry.tag_keys.clone(),
                        actual: tag_keys,
                    });
                }
                entry.metadata.clone()
            },
            None => metadata,
        };

        let metric = create(&id, &metadata);
        state
            .names
            .entry(id.name().to_owned())
            .or_insert_with(|| NameEntry {
                metadata: metadata.clone(),
                tag_keys,
                ids: 0,
            })
            .ids += 1;
        state.metrics.insert(id.clone(), metric.clone());

        debug!("registered {} {} in {} registry", metadata.kind(), id, self.scope);
        Ok(metric)
    }

    fn remove_locked(&self, state: &mut State, id: &MetricId) -> bool {
        let metric = match state.metrics.remove(id) {
            Some(metric) => metric,
            None => return false,
        };
        metric.detach();

        let emptied = match state.names.get_mut(id.name()) {
            Some(entry) => {
                entry.ids -= 1;
                entry.ids == 0
            },
            None => false,
        };
        if emptied {
            state.names.remove(id.name());
        }

        debug!("removed {} {} from {} registry", metric.kind(), id, self.scope);
        true
    }

    fn qualify(&self, id: &MetricId) -> MetricId { id.with_tags(self.config.global_tags.tags()) }

    fn reservoir(&self) -> DecayingReservoir {
        DecayingReservoir::new(self.config.reservoir_size, self.config.reservoir_alpha, self.config.clock.now())
    }

    fn make_counter(&self, id: &MetricId, metadata: &Metadata) -> Metric {
        Metric::Counter(Arc::new(Counter::new(id.to_string(), metadata.is_monotonic())))
    }

    fn make_histogram(&self, id: &MetricId, _: &Metadata) -> Metric {
        let resolved = self.config.distribution.resolve(id.name());
        let percentiles = resolved.percentiles.unwrap_or_else(|| self.config.percentiles.clone());
        Metric::Histogram(Arc::new(Histogram::new(
            id.to_string(),
            self.config.clock.clone(),
            self.reservoir(),
            percentiles,
            resolved.histogram_buckets,
        )))
    }

    fn make_meter(&self, id: &MetricId, _: &Metadata) -> Metric {
        Metric::Meter(Arc::new(Meter::new(id.to_string(), self.config.clock.clone())))
    }

    fn make_timer(&self, id: &MetricId, _: &Metadata) -> Metric {
        let resolved = self.config.distribution.resolve(id.name());
        let percentiles = resolved.percentiles.unwrap_or_else(|| self.config.percentiles.clone());
        let buckets = resolved.timer_buckets.iter().map(|d| d.as_nanos() as f64).collect();
        Metric::Timer(Arc::new(Timer::new(
            id.to_string(),
            self.config.clock.clone(),
            self.reservoir(),
            percentiles,
            buckets,
        )))
    }

    fn make_simple_timer(&self, id: &MetricId, _: &Metadata) -> Metric {
        Metric::SimpleTimer(Arc::new(SimpleTimer::new(id.to_string(), self.config.clock.clone())))
    }

    fn make_concurrent_gauge(&self, id: &MetricId, _: &Metadata) -> Metric {
        Metric::ConcurrentGauge(Arc::new(ConcurrentGauge::new(id.to_string(), self.config.clock.clone())))
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("scope", &self.scope)
            .field("metrics", &self.len())
            .finish()
    }
}

fn check_compatible(entry: &NameEntry, requested: &Metadata, explicit: bool) -> Result<()> {
    let conflict = if explicit {
        entry.metadata.conflict_with(requested)
    } else if entry.metadata.kind() != requested.kind() {
        Some(format!(
            "kind {} differs from registered {}",
            requested.kind(),
            entry.metadata.kind()
        ))
    } else {
        None
    };

    match conflict {
        Some(reason) => Err(MetricsError::MetadataConflict {
            name: requested.name().to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

fn typed<T>(typed: Option<&Arc<T>>, name: &str, metric: &Metric) -> Result<Arc<T>> {
    typed.cloned().ok_or_else(|| MetricsError::MetadataConflict {
        name: name.to_owned(),
        reason: format!("registered as {}", metric.kind()),
    })
}

#[cfg(test)]
mod tests {
    use super::{RegistryType, Registries, Scope};
    use crate::{
        clock::Clock,
        configuration::Configuration,
        error::MetricsError,
        global::GlobalTags,
        id::MetricId,
        metadata::{Metadata, MetricKind, MetricUnits},
        tag::Tag,
    };
    use std::{sync::Arc, time::Duration};

    fn tag(k: &str, v: &str) -> Tag { Tag::new(k, v).unwrap() }

    fn registries() -> Registries {
        let (clock, _) = Clock::mock();
        Configuration::new().clock(clock).build()
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!(Scope::parse("base").unwrap(), Scope::Base);
        assert_eq!("vendor".parse::<Scope>().unwrap(), Scope::Vendor);
        assert_eq!(Scope::parse("application").unwrap(), Scope::Application);
        assert_eq!(Scope::parse("custom").unwrap(), Scope::Custom("custom".to_owned()));
        assert_eq!(Scope::parse("  "), Err(MetricsError::InvalidScope));
        assert_eq!(Scope::Custom("x".to_owned()).to_string(), "x");
    }

    #[test]
    fn test_scope_lookup_paths_agree() {
        let registries = registries();
        let by_type = registries.get(RegistryType::Application);
        let by_scope = registries.get(Scope::Application);
        let by_name = registries.scope("application").unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_scope));
        assert!(Arc::ptr_eq(&by_type, &by_name));
        assert!(Arc::ptr_eq(&registries.application(), &by_name));

        let custom = registries.scope("jobs").unwrap();
        assert!(Arc::ptr_eq(&custom, &registries.get(Scope::Custom("jobs".to_owned()))));
        assert!(!Arc::ptr_eq(&custom, &registries.base()));
        assert!(registries.scope("").is_err());

        assert_eq!(
            registries.scopes(),
            vec![Scope::Base, Scope::Application, Scope::Custom("jobs".to_owned())]
        );
    }

    #[test]
    fn test_scopes_are_isolated() {
        let registries = registries();
        registries.base().counter("c", &[]).unwrap().inc().unwrap();
        assert!(registries.vendor().get_counter(&MetricId::named("c")).is_none());
        registries.vendor().timer("c", &[]).unwrap();
        assert_eq!(registries.base().metadata("c").unwrap().kind(), MetricKind::Counter);
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = registries().application();
        let a = registry.counter("hits", &[tag("page", "home")]).unwrap();
        a.inc().unwrap();
        let b = registry.counter("hits", &[tag("page", "home")]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_kind_conflict() {
        let registry = registries().application();
        registry.counter("x", &[]).unwrap();
        match registry.histogram("x", &[]) {
            Err(MetricsError::MetadataConflict { name, .. }) => assert_eq!(name, "x"),
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }

        // Different tags do not help either.
        assert!(registry.meter("x", &[tag("a", "b")]).is_err());
    }

    #[test]
    fn test_explicit_metadata_must_match() {
        let registry = registries().application();
        let md = Metadata::builder("bytes_in")
            .description("bytes received")
            .unit(MetricUnits::BYTES)
            .build();
        registry.histogram_with(md.clone(), &[]).unwrap();
        registry.histogram_with(md, &[]).unwrap();

        let different = Metadata::builder("bytes_in").description("something else").build();
        assert!(matches!(
            registry.histogram_with(different, &[]),
            Err(MetricsError::MetadataConflict { .. })
        ));

        // Accessors without metadata reuse what is registered.
        assert!(registry.histogram("bytes_in", &[tag("k", "v")]).is_err());
        let h = registry.histogram("bytes_in", &[]).unwrap();
        assert_eq!(h.count(), 0);
        assert_eq!(registry.metadata("bytes_in").unwrap().unit(), MetricUnits::BYTES);
        assert_eq!(registry.metadata("bytes_in").unwrap().kind(), MetricKind::Histogram);
    }

    #[test]
    fn test_tag_key_set_rules() {
        let registry = registries().application();
        let red = registry.counter("foo", &[tag("colour", "red")]).unwrap();
        let blue = registry.counter("foo", &[tag("colour", "blue")]).unwrap();
        assert!(!Arc::ptr_eq(&red, &blue));

        match registry.counter("foo", &[tag("name", "x")]) {
            Err(MetricsError::TagKeySetConflict { expected, actual, .. }) => {
                assert_eq!(expected, vec!["colour".to_owned()]);
                assert_eq!(actual, vec!["name".to_owned()]);
            },
            other => panic!("expected tag key conflict, got {:?}", other.map(|_| ())),
        }
        assert!(registry.counter("foo", &[]).is_err());
        assert_eq!(registry.metric_ids().len(), 2);
    }

    #[test]
    fn test_reserved_tags_refused() {
        let registry = registries().application();
        let result = registry.counter("c", &[Tag::unchecked("mp_scope", "x")]);
        assert!(matches!(result, Err(MetricsError::InvalidTag { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_global_tags_appended() {
        let (clock, _) = Clock::mock();
        let registries = Configuration::new()
            .clock(clock)
            .global_tags(GlobalTags::new(vec![tag("tier", "web")]))
            .build();
        let registry = registries.application();

        registry.counter("c", &[tag("a", "1")]).unwrap();
        let ids = registry.metric_ids();
        assert_eq!(ids[0].tag_keys(), vec!["a".to_owned(), "tier".to_owned()]);

        // Lookups and removal accept ids with or without the global tags.
        let bare = MetricId::new("c", vec![tag("a", "1")]);
        assert!(registry.get_counter(&bare).is_some());
        assert!(registry.get_counter(&ids[0]).is_some());
        assert!(registry.remove(&bare));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_detaches() {
        let registry = registries().application();
        let counter = registry.counter("c", &[]).unwrap();
        counter.inc().unwrap();

        assert!(registry.remove(&MetricId::named("c")));
        assert!(!registry.remove(&MetricId::named("c")));
        assert!(registry.metric_ids().is_empty());
        assert!(registry.metadata("c").is_none());
        assert!(matches!(counter.inc(), Err(MetricsError::DetachedMetric(_))));

        // The name is free again, even for another kind.
        let fresh = registry.timer("c", &[]).unwrap();
        assert_eq!(fresh.count(), 0);
    }

    #[test]
    fn test_remove_name_covers_all_tags() {
        let registry = registries().application();
        let one = registry.counter("c", &[tag("k", "1")]).unwrap();
        let two = registry.counter("c", &[tag("k", "2")]).unwrap();
        let meter = registry.meter("m", &[]).unwrap();

        assert!(registry.remove_name("c"));
        assert!(!registry.remove_name("c"));
        assert_eq!(registry.names(), vec!["m".to_owned()]);

        assert!(matches!(one.inc(), Err(MetricsError::DetachedMetric(_))));
        assert!(matches!(two.inc_by(3), Err(MetricsError::DetachedMetric(_))));
        assert!(meter.mark().is_ok());
    }

    #[test]
    fn test_query_and_remove_matching() {
        let registry = registries().application();
        let counter = registry.counter("a", &[]).unwrap();
        let b = registry.timer("b", &[]).unwrap();
        let c = registry.timer("c", &[tag("k", "v")]).unwrap();
        registry.gauge("d", &[], || 1.0).unwrap();

        let timers = registry.query(|_, md| md.kind() == MetricKind::Timer);
        let names: Vec<&str> = timers.iter().map(|(id, _)| id.name()).collect();
        assert_eq!(names, vec!["b", "c"]);

        let tagged = registry.query(|id, _| id.tags_map().get("k") == Some(&"v"));
        assert_eq!(tagged.len(), 1);

        assert_eq!(registry.remove_matching(|_, md| md.kind() == MetricKind::Timer), 2);
        assert_eq!(registry.names(), vec!["a".to_owned(), "d".to_owned()]);
        assert_eq!(registry.metrics().len(), 2);

        assert!(matches!(b.update(Duration::from_millis(1)), Err(MetricsError::DetachedMetric(_))));
        assert!(matches!(c.time().stop(), Err(MetricsError::DetachedMetric(_))));
        assert!(counter.inc().is_ok());
    }

    #[test]
    fn test_gauge_keeps_first_supplier() {
        let registry = registries().application();
        let first = registry.gauge("g", &[], || 1.0).unwrap();
        let second = registry.gauge("g", &[], || 2.0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.value(), 1.0);
    }

    #[test]
    fn test_distribution_overrides_applied() {
        let (clock, _) = Clock::mock();
        let distribution = crate::distribution::DistributionConfig::new()
            .percentiles("quiet=;loud=0.9")
            .histogram_buckets("loud=1,10")
            .timer_buckets("slow=1s");
        let registries = Configuration::new().clock(clock).distribution(distribution).build();
        let registry = registries.application();

        assert!(registry.histogram("quiet", &[]).unwrap().percentiles().is_empty());
        let loud = registry.histogram("loud", &[]).unwrap();
        assert_eq!(loud.percentiles().len(), 1);
        loud.update(5).unwrap();
        let counts: Vec<u64> = loud.snapshot().buckets().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 1]);

        assert_eq!(registry.histogram("plain", &[]).unwrap().percentiles().len(), 6);

        let slow = registry.timer("slow", &[]).unwrap();
        assert_eq!(slow.snapshot().buckets()[0].upper_bound, 1_000_000_000.0);
    }

    #[test]
    fn test_non_monotonic_counter() {
        let registry = registries().application();
        let md = Metadata::builder("queue").monotonic(false).build();
        let counter = registry.counter_with(md, &[]).unwrap();
        counter.inc_by(-2).unwrap();
        assert_eq!(counter.count(), -2);

        // A plain lookup reuses the registered metadata.
        let again = registry.counter("queue", &[]).unwrap();
        assert!(!again.is_monotonic());
    }
}

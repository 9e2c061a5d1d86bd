use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use std::env;

/// A read-only source of configuration properties.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads properties from the process environment.
///
/// A dotted key such as `mp.metrics.tags` is looked up verbatim first, then with every
/// non-alphanumeric character replaced by `_`, and finally upper-cased (`MP_METRICS_TAGS`).
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let upper = sanitized.to_ascii_uppercase();

        [key, sanitized.as_str(), upper.as_str()]
            .iter()
            .find_map(|candidate| env::var(candidate).ok())
    }
}

/// Properties held in memory.
#[derive(Clone, Debug, Default)]
pub struct MapSource {
    properties: HashMap<String, String, FnvBuildHasher>,
}

impl MapSource {
    pub fn new() -> MapSource { MapSource::default() }

    /// Adds a property, replacing any previous value.
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> MapSource {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> { self.properties.get(key).cloned() }
}

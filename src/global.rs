use crate::{source::ConfigSource, tag::Tag};
use log::warn;
use std::collections::BTreeMap;

/// Environment variable holding global tags.
pub const TAGS_ENV: &str = "MP_METRICS_TAGS";

/// Configuration property holding global tags.
pub const TAGS_PROPERTY: &str = "mp.metrics.tags";

/// Configuration property naming the application.
pub const APP_NAME_PROPERTY: &str = "mp.metrics.appName";

/// Tag key carrying the application name.
pub const APP_TAG: &str = "_app";

/// Tags appended to every metric id created by a registry.
///
/// Resolved once at startup and immutable afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalTags {
    tags: Vec<Tag>,
}

impl GlobalTags {
    pub fn empty() -> GlobalTags { GlobalTags::default() }

    /// Builds global tags from already validated tags; later keys replace earlier ones.
    pub fn new<I: IntoIterator<Item = Tag>>(tags: I) -> GlobalTags {
        let by_key: BTreeMap<String, Tag> = tags.into_iter().map(|t| (t.key().to_owned(), t)).collect();
        GlobalTags {
            tags: by_key.into_iter().map(|(_, t)| t).collect(),
        }
    }

    /// Resolves global tags from an environment source and a configuration source.
    ///
    /// Tags from `config` replace environment tags with the same key.  An application name, if
    /// configured, becomes the `_app` tag.
    pub fn resolve(env: &dyn ConfigSource, config: &dyn ConfigSource) -> GlobalTags {
        let mut merged = BTreeMap::new();
        for raw in env.get(TAGS_ENV).iter().chain(config.get(TAGS_PROPERTY).iter()) {
            for tag in parse(raw) {
                merged.insert(tag.key().to_owned(), tag);
            }
        }

        let app = config.get(APP_NAME_PROPERTY).or_else(|| env.get(APP_NAME_PROPERTY));
        if let Some(app) = app.filter(|a| !a.trim().is_empty()) {
            merged.insert(APP_TAG.to_owned(), Tag::unchecked(APP_TAG, app.trim()));
        }

        GlobalTags {
            tags: merged.into_iter().map(|(_, t)| t).collect(),
        }
    }

    /// Tags sorted by key.
    pub fn tags(&self) -> &[Tag] { &self.tags }

    pub fn is_empty(&self) -> bool { self.tags.is_empty() }
}

/// Parses `k1=v1,k2=v2`, where `\,` and `\=` escape literal separators.
///
/// Malformed pairs and invalid keys are skipped with a warning.
pub fn parse(raw: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    for pair in split_escaped(raw, ',') {
        if pair.trim().is_empty() {
            continue;
        }

        let parts = split_escaped(&pair, '=');
        if parts.len() != 2 {
            warn!("ignoring malformed global tag {:?}", pair);
            continue;
        }

        let key = unescape(parts[0].trim());
        let value = unescape(parts[1].trim());
        match Tag::new(key, value) {
            Ok(tag) => tags.push(tag),
            Err(e) => warn!("ignoring global tag {:?}: {}", pair, e),
        }
    }
    tags
}

// Splits on `sep` unless it is preceded by a backslash.  Escapes are left in place.
fn split_escaped(raw: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

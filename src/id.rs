use crate::{error::Result, tag::Tag};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

/// Identity of a metric inside a registry: a name plus a set of tags.
///
/// Tags are normalized on construction.  When a key repeats, the last value wins, and the
/// remaining tags are kept sorted by key, so two ids built from the same pairs in any order are
/// equal and hash identically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MetricId {
    name: String,
    tags: Vec<Tag>,
}

impl MetricId {
    pub fn new<N, I>(name: N, tags: I) -> MetricId
    where
        N: Into<String>,
        I: IntoIterator<Item = Tag>,
    {
        MetricId {
            name: name.into(),
            tags: normalize(tags),
        }
    }

    /// Creates an id with no tags.
    pub fn named<N: Into<String>>(name: N) -> MetricId { MetricId::new(name, Vec::new()) }

    /// Creates an id from raw key/value pairs, validating each key.
    pub fn with_pairs<N: Into<String>>(name: N, pairs: &[(&str, &str)]) -> Result<MetricId> {
        let tags = pairs
            .iter()
            .map(|(k, v)| Tag::new(*k, *v))
            .collect::<Result<Vec<_>>>()?;
        Ok(MetricId::new(name, tags))
    }

    pub fn name(&self) -> &str { &self.name }

    /// Tags sorted by key.
    pub fn tags(&self) -> &[Tag] { &self.tags }

    /// Tags as an ordered key/value map.
    pub fn tags_map(&self) -> BTreeMap<&str, &str> { self.tags.iter().map(|t| (t.key(), t.value())).collect() }

    /// Sorted tag keys.
    pub fn tag_keys(&self) -> Vec<String> { self.tags.iter().map(|t| t.key().to_owned()).collect() }

    /// Returns a copy of this id with `extra` appended.
    ///
    /// Appended tags replace existing tags with the same key.
    pub fn with_tags<'a, I>(&self, extra: I) -> MetricId
    where
        I: IntoIterator<Item = &'a Tag>,
    {
        let merged = self.tags.iter().cloned().chain(extra.into_iter().cloned());
        MetricId::new(self.name.clone(), merged)
    }
}

fn normalize<I: IntoIterator<Item = Tag>>(tags: I) -> Vec<Tag> {
    let mut by_key = BTreeMap::new();
    for tag in tags {
        by_key.insert(tag.key().to_owned(), tag);
    }
    by_key.into_iter().map(|(_, tag)| tag).collect()
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.tags.is_empty() {
            return Ok(());
        }

        write!(f, "{{")?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "}}")
    }
}

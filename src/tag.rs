use crate::error::{MetricsError, Result};
use serde::Serialize;
use std::fmt;

/// Prefix reserved for tags injected by the registry and exposition layers.
pub const RESERVED_PREFIX: &str = "mp_";

/// A key/value pair attached to a metric.
///
/// Tags order by key and then by value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Creates a user tag.
    ///
    /// Fails if the key is empty, is not of the form `[A-Za-z_][A-Za-z0-9_]*`, or starts with the
    /// reserved `mp_` prefix.
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Result<Tag> {
        let tag = Tag::unchecked(key, value);
        tag.validate()?;
        Ok(tag)
    }

    /// Creates a tag without validating the key.
    ///
    /// Meant for exposition layers that attach reserved tags such as `mp_scope`.  Registries still
    /// refuse such tags on their registration paths.
    pub fn unchecked<K: Into<String>, V: Into<String>>(key: K, value: V) -> Tag {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str { &self.key }

    pub fn value(&self) -> &str { &self.value }

    /// Whether the key uses the reserved prefix.
    pub fn is_reserved(&self) -> bool { self.key.starts_with(RESERVED_PREFIX) }

    /// Checks the key against the rules applied to user-supplied tags.
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;
        if self.is_reserved() {
            return Err(invalid(&self.key, "the `mp_` prefix is reserved"));
        }
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    match chars.next() {
        None => return Err(invalid(key, "key must not be empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid(key, "key must start with a letter or underscore"));
        },
        _ => {},
    }

    if chars.any(|c| !(c.is_ascii_alphanumeric() || c == '_')) {
        return Err(invalid(key, "key may only contain letters, digits and underscores"));
    }

    Ok(())
}

fn invalid(key: &str, reason: &'static str) -> MetricsError {
    MetricsError::InvalidTag {
        key: key.to_owned(),
        reason,
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}=\"{}\"", self.key, self.value) }
}

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised by the registry and by metric handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// A tag key was empty, malformed, or used the reserved `mp_` prefix.
    #[error("invalid tag `{key}`: {reason}")]
    InvalidTag { key: String, reason: &'static str },

    /// A name was registered again with metadata that does not match the first registration.
    #[error("metadata for `{name}` conflicts with existing registration: {reason}")]
    MetadataConflict { name: String, reason: String },

    /// A name was registered again with a different set of tag keys.
    #[error("tag keys {actual:?} for `{name}` do not match registered keys {expected:?}")]
    TagKeySetConflict {
        name: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// The metric was removed from its registry and can no longer be updated.
    #[error("metric `{0}` has been removed from its registry")]
    DetachedMetric(String),

    /// An argument was rejected, e.g. a negative delta on a monotonic counter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The scope name was empty.
    #[error("invalid scope: scope names must be non-empty")]
    InvalidScope,
}

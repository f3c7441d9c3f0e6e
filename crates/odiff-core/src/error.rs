//! Error types for the diff engine.

use odiff_types::{NodePath, TypeError, ValueType};

/// Errors that abort a comparison.
///
/// Circular references are not errors: they are recovered inside the
/// dispatcher and surface as [`DiffState::Circular`](crate::DiffState::Circular)
/// nodes.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// No registered differ accepts the type. A provider must always carry a
    /// fallback, so this is a configuration defect.
    #[error("no differ available for type '{0}'; the provider is missing a fallback differ")]
    NoDifferForType(ValueType),

    /// The traversal went deeper than the configured limit.
    #[error("maximum comparison depth {max} exceeded at {path}")]
    DepthLimitExceeded { path: NodePath, max: usize },

    /// A custom differ failed.
    #[error("differ '{differ}' failed: {message}")]
    Strategy { differ: String, message: String },

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Value or path construction failed.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl DiffError {
    /// Create a strategy error with a differ name and message.
    pub fn strategy(differ: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Strategy {
            differ: differ.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::circular::CircularReferenceMatchingMode;
use crate::error::{DiffError, DiffResult};
use crate::filtering::FilteringConfig;
use crate::inclusion::InclusionConfig;

/// Circular reference handling options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularReferenceConfig {
    /// How a container already being compared is recognised.
    pub matching_mode: CircularReferenceMatchingMode,
}

/// Configuration for an [`ObjectDiffer`](crate::ObjectDiffer).
///
/// Every section is optional in TOML form:
///
/// ```toml
/// max_depth = 64
///
/// [circular_references]
/// matching_mode = "equality_method"
///
/// [inclusion]
/// excluded_paths = ["/metadata"]
/// excluded_properties = ["updated_at"]
///
/// [filtering]
/// returnable_states = ["added", "removed", "changed", "circular"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferConfig {
    /// Deepest path allowed below the root; `None` means unbounded.
    pub max_depth: Option<usize>,
    pub circular_references: CircularReferenceConfig,
    pub inclusion: InclusionConfig,
    pub filtering: FilteringConfig,
}

impl DifferConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> DiffResult<Self> {
        toml::from_str(s).map_err(|e| DiffError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> DiffResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DiffError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> DiffResult<String> {
        toml::to_string(self).map_err(|e| DiffError::Config(e.to_string()))
    }

    pub fn with_matching_mode(mut self, mode: CircularReferenceMatchingMode) -> Self {
        self.circular_references.matching_mode = mode;
        self
    }
}

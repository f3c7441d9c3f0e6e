//! Structural diff engine for object graphs.
//!
//! Compares a *working* and a *base* version of a [`Value`] graph and
//! produces a [`DiffTree`] whose nodes describe every added, removed,
//! changed, untouched, ignored, or circular location, each addressed by a
//! stable [`NodePath`](odiff_types::NodePath).
//!
//! The traversal is driven by the [`Dispatcher`]: it applies inclusion
//! rules, tracks the containers open on each side to terminate cycles, and
//! hands each location to the [`Differ`] registered for its type. Differs
//! call back into the dispatcher for nested locations.
//!
//! # Quick Start
//!
//! ```rust
//! use odiff_core::{DiffState, ObjectDiffer};
//! use odiff_types::{Record, Value};
//!
//! let working = Value::record(Record::new("Point").with_field("x", 1).with_field("y", 2));
//! let base = Value::record(Record::new("Point").with_field("x", 1).with_field("y", 3));
//!
//! let tree = ObjectDiffer::default().compare(&working, &base).unwrap();
//! assert_eq!(tree.root_node().state(), DiffState::Changed);
//! assert_eq!(tree.child_property("y").unwrap().state(), DiffState::Changed);
//! ```

pub mod accessor;
pub mod circular;
pub mod config;
pub mod differ;
pub mod differs;
pub mod dispatcher;
pub mod error;
pub mod filtering;
pub mod inclusion;
pub mod instances;
pub mod node;
pub mod object_differ;

// Re-exports for convenience.
pub use accessor::{Accessor, ListItemAccessor, MapEntryAccessor, PropertyAccessor, RootAccessor};
pub use circular::{
    CircularReference, CircularReferenceDetector, CircularReferenceHandler,
    CircularReferenceMatchingMode, LoggingCircularReferenceHandler,
};
pub use config::{CircularReferenceConfig, DifferConfig};
pub use differ::{Differ, DifferProvider};
pub use differs::{ListDiffer, MapDiffer, PrimitiveDiffer, RecordDiffer};
pub use dispatcher::{DiffContext, Dispatcher};
pub use error::{DiffError, DiffResult};
pub use filtering::{FilteringConfig, FilteringResolver, IsReturnableResolver};
pub use inclusion::{InclusionConfig, InclusionResolver, IsIgnoredResolver};
pub use instances::Instances;
pub use node::{ChangeSummary, DiffNode, DiffState, DiffTree, NodeId};
pub use object_differ::{ObjectDiffer, ObjectDifferBuilder};

pub use odiff_types::Value;

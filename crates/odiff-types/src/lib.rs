//! Foundation types for odiff.
//!
//! This crate provides the object-graph value model and the path type that
//! every other odiff crate builds on.
//!
//! # Key Types
//!
//! - [`Value`] -- Scalar or shared handle to a record, list, or map
//! - [`Record`] -- Named bag of properties with a type name
//! - [`ObjectIdentity`] -- Allocation identity of a container
//! - [`ValueType`] -- Runtime type used to select comparison strategies
//! - [`NodePath`] / [`ElementSelector`] -- Stable address of a graph location

pub mod error;
pub mod json;
pub mod path;
pub mod value;

pub use error::TypeError;
pub use path::{ElementSelector, NodePath};
pub use value::{ListRef, MapRef, ObjectIdentity, Record, RecordRef, Value, ValueType};

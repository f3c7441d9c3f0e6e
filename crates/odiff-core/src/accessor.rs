//! Accessors project a parent value down to one child location.

use odiff_types::{ElementSelector, Value};

/// Extracts one child location from a parent value.
///
/// The same accessor is applied to the working and the base side. It
/// contributes exactly one [`ElementSelector`] to the child's path and must be
/// deterministic and free of side effects.
pub trait Accessor {
    /// The path step this accessor contributes.
    fn element(&self) -> ElementSelector;

    /// The child value inside `target`, or [`Value::Null`] if absent.
    fn get(&self, target: &Value) -> Value;
}

/// Identity accessor used for the top-level comparison.
#[derive(Clone, Copy, Debug, Default)]
pub struct RootAccessor;

impl Accessor for RootAccessor {
    fn element(&self) -> ElementSelector {
        ElementSelector::Root
    }

    fn get(&self, target: &Value) -> Value {
        target.clone()
    }
}

/// Reads a named property of a record.
#[derive(Clone, Debug)]
pub struct PropertyAccessor {
    name: String,
}

impl PropertyAccessor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Accessor for PropertyAccessor {
    fn element(&self) -> ElementSelector {
        ElementSelector::Property(self.name.clone())
    }

    fn get(&self, target: &Value) -> Value {
        target.field(&self.name)
    }
}

/// Reads the item at a fixed position of a list.
#[derive(Clone, Copy, Debug)]
pub struct ListItemAccessor {
    index: usize,
}

impl ListItemAccessor {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Accessor for ListItemAccessor {
    fn element(&self) -> ElementSelector {
        ElementSelector::Index(self.index)
    }

    fn get(&self, target: &Value) -> Value {
        target.item(self.index)
    }
}

/// Reads the entry for a key of a map.
#[derive(Clone, Debug)]
pub struct MapEntryAccessor {
    key: String,
}

impl MapEntryAccessor {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Accessor for MapEntryAccessor {
    fn element(&self) -> ElementSelector {
        ElementSelector::MapKey(self.key.clone())
    }

    fn get(&self, target: &Value) -> Value {
        target.entry(&self.key)
    }
}

//! Comparison strategies and the registry that selects them.

use odiff_types::ValueType;

use crate::dispatcher::{DiffContext, Dispatcher};
use crate::error::DiffResult;
use crate::instances::Instances;
use crate::node::NodeId;
use crate::differs::{ListDiffer, MapDiffer, PrimitiveDiffer, RecordDiffer};

/// Compares the two sides of one location.
///
/// A differ creates the node for `instances` under `parent` (via
/// [`DiffContext::new_node`]), decides its state, and may call back into
/// [`Dispatcher::dispatch`] for nested locations. It never touches cycle
/// tracking; the dispatcher wraps every invocation.
///
/// The trait is object-safe and `Send + Sync` so differs can be stored in
/// a `Vec<Box<dyn Differ>>`.
pub trait Differ: Send + Sync {
    /// Human-readable name of this differ (e.g., "record", "primitive").
    fn name(&self) -> &str;

    /// Returns `true` if this differ can compare values of `value_type`.
    fn accepts(&self, value_type: &ValueType) -> bool;

    /// Compare the pair and return the id of the node created for it.
    fn compare(
        &self,
        dispatcher: &Dispatcher,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        instances: &Instances,
    ) -> DiffResult<NodeId>;
}

/// Ordered list of differs; the first one that accepts a type wins.
pub struct DifferProvider {
    differs: Vec<Box<dyn Differ>>,
}

impl DifferProvider {
    /// An empty provider. Without a fallback, unknown types are a fatal
    /// [`DiffError::NoDifferForType`](crate::DiffError::NoDifferForType).
    pub fn new() -> Self {
        Self {
            differs: Vec::new(),
        }
    }

    /// Record, list, and map differs followed by the primitive fallback.
    pub fn with_defaults() -> Self {
        let mut provider = Self::new();
        provider.push(Box::new(RecordDiffer));
        provider.push(Box::new(ListDiffer));
        provider.push(Box::new(MapDiffer));
        provider.push(Box::new(PrimitiveDiffer));
        provider
    }

    /// Append a differ at the lowest priority.
    pub fn push(&mut self, differ: Box<dyn Differ>) {
        self.differs.push(differ);
    }

    /// Insert a differ at the highest priority.
    pub fn register(&mut self, differ: Box<dyn Differ>) {
        self.differs.insert(0, differ);
    }

    /// The first differ accepting `value_type`.
    pub fn retrieve_differ_for_type(&self, value_type: &ValueType) -> Option<&dyn Differ> {
        self.differs
            .iter()
            .find(|d| d.accepts(value_type))
            .map(|d| d.as_ref())
    }

    /// Names of the registered differs in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.differs.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.differs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.differs.is_empty()
    }
}

impl Default for DifferProvider {
    fn default() -> Self {
        Self::with_defaults()
    }
}

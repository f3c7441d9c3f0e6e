use odiff_types::ValueType;

use crate::differ::Differ;
use crate::dispatcher::{DiffContext, Dispatcher};
use crate::error::DiffResult;
use crate::instances::Instances;
use crate::node::{DiffState, NodeId};

/// Compares both sides as opaque values.
///
/// Accepts every type, so it must be registered last.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitiveDiffer;

impl Differ for PrimitiveDiffer {
    fn name(&self) -> &str {
        "primitive"
    }

    fn accepts(&self, _value_type: &ValueType) -> bool {
        true
    }

    fn compare(
        &self,
        _dispatcher: &Dispatcher,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        instances: &Instances,
    ) -> DiffResult<NodeId> {
        let node = context.new_node(parent, instances);
        let state = if instances.has_been_added() {
            DiffState::Added
        } else if instances.has_been_removed() {
            DiffState::Removed
        } else if instances.are_same() || instances.are_equal() {
            DiffState::Untouched
        } else {
            DiffState::Changed
        };
        context.set_state(node, state);
        Ok(node)
    }
}

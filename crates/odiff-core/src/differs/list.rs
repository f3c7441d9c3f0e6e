use odiff_types::ValueType;

use crate::accessor::ListItemAccessor;
use crate::differ::Differ;
use crate::dispatcher::{DiffContext, Dispatcher};
use crate::error::DiffResult;
use crate::instances::Instances;
use crate::node::{DiffState, NodeId};

use super::container_state;

/// Compares lists position by position.
///
/// Positions past the end of the shorter side come out as added or removed
/// items.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListDiffer;

impl Differ for ListDiffer {
    fn name(&self) -> &str {
        "list"
    }

    fn accepts(&self, value_type: &ValueType) -> bool {
        *value_type == ValueType::List
    }

    fn compare(
        &self,
        dispatcher: &Dispatcher,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        instances: &Instances,
    ) -> DiffResult<NodeId> {
        let node = context.new_node(parent, instances);
        if instances.are_same() {
            context.set_state(node, DiffState::Untouched);
            return Ok(node);
        }

        let len = instances.working().len().max(instances.base().len());
        for index in 0..len {
            dispatcher.dispatch(context, Some(node), instances, &ListItemAccessor::new(index))?;
        }

        let state = container_state(context, node, instances);
        context.set_state(node, state);
        Ok(node)
    }
}

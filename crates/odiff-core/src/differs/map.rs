use odiff_types::ValueType;

use crate::accessor::MapEntryAccessor;
use crate::differ::Differ;
use crate::dispatcher::{DiffContext, Dispatcher};
use crate::error::DiffResult;
use crate::instances::Instances;
use crate::node::{DiffState, NodeId};

use super::container_state;

/// Compares maps entry by entry over the sorted union of keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapDiffer;

impl Differ for MapDiffer {
    fn name(&self) -> &str {
        "map"
    }

    fn accepts(&self, value_type: &ValueType) -> bool {
        *value_type == ValueType::Map
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

        let mut keys = instances.working().keys();
        keys.extend(instances.base().keys());
        for key in keys {
            dispatcher.dispatch(context, Some(node), instances, &MapEntryAccessor::new(key))?;
        }

        let state = container_state(context, node, instances);
        context.set_state(node, state);
        Ok(node)
    }
}

use odiff_types::ValueType;

use crate::accessor::PropertyAccessor;
use crate::differ::Differ;
use crate::dispatcher::{DiffContext, Dispatcher};
use crate::error::DiffResult;
use crate::instances::Instances;
use crate::node::{DiffState, NodeId};

use super::container_state;

/// Compares records property by property.
///
/// Properties are visited in sorted order over the union of both sides.
/// Added and removed records are still descended into so that their
/// properties show up in the tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordDiffer;

impl Differ for RecordDiffer {
    fn name(&self) -> &str {
        "record"
    }

    fn accepts(&self, value_type: &ValueType) -> bool {
        matches!(value_type, ValueType::Record(_))
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

        let mut names = instances.working().field_names();
        names.extend(instances.base().field_names());
        for name in names {
            dispatcher.dispatch(context, Some(node), instances, &PropertyAccessor::new(name))?;
        }

        let state = container_state(context, node, instances);
        context.set_state(node, state);
        Ok(node)
    }
}

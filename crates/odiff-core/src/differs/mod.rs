//! Built-in differs.
//!
//! - [`RecordDiffer`] -- property-by-property comparison of records
//! - [`ListDiffer`] -- position-by-position comparison of lists
//! - [`MapDiffer`] -- key-by-key comparison of maps
//! - [`PrimitiveDiffer`] -- equality comparison; accepts every type and
//!   serves as the fallback

pub mod list;
pub mod map;
pub mod primitive;
pub mod record;

pub use list::ListDiffer;
pub use map::MapDiffer;
pub use primitive::PrimitiveDiffer;
pub use record::RecordDiffer;

use crate::dispatcher::DiffContext;
use crate::instances::Instances;
use crate::node::{DiffState, NodeId};

/// State of a container node after its children were dispatched.
pub(crate) fn container_state(context: &DiffContext, node: NodeId, instances: &Instances) -> DiffState {
    if instances.has_been_added() {
        DiffState::Added
    } else if instances.has_been_removed() {
        DiffState::Removed
    } else if context.has_changes(node) {
        DiffState::Changed
    } else {
        DiffState::Untouched
    }
}

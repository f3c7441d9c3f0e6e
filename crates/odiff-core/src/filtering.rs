//! Pruning of completed nodes from the output tree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::node::{DiffNode, DiffState};

/// Decides whether a completed node is attached to its parent.
///
/// Pruning only shapes the output; the traversal has already happened.
pub trait IsReturnableResolver: Send + Sync {
    fn is_returnable(&self, node: &DiffNode) -> bool;
}

/// States whose nodes appear in the output tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    pub returnable_states: BTreeSet<DiffState>,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            returnable_states: DiffState::ALL.into_iter().collect(),
        }
    }
}

impl FilteringConfig {
    /// Only differences and detected cycles.
    pub fn changes_only() -> Self {
        Self {
            returnable_states: [
                DiffState::Added,
                DiffState::Removed,
                DiffState::Changed,
                DiffState::Circular,
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn omit(mut self, state: DiffState) -> Self {
        self.returnable_states.remove(&state);
        self
    }
}

/// [`IsReturnableResolver`] backed by a [`FilteringConfig`].
///
/// A node that already has attached children is always returned so that its
/// descendants stay reachable.
#[derive(Clone, Debug, Default)]
pub struct FilteringResolver {
    config: FilteringConfig,
}

impl FilteringResolver {
    pub fn new(config: FilteringConfig) -> Self {
        Self { config }
    }
}

impl IsReturnableResolver for FilteringResolver {
    fn is_returnable(&self, node: &DiffNode) -> bool {
        node.has_children() || self.config.returnable_states.contains(&node.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odiff_types::ElementSelector;

    fn node(state: DiffState) -> DiffNode {
        let mut n = DiffNode::candidate(None, ElementSelector::property("a"), "/a".parse().unwrap());
        n.set_state(state);
        n
    }

    #[test]
    fn default_returns_every_state() {
        let resolver = FilteringResolver::default();
        for state in DiffState::ALL {
            assert!(resolver.is_returnable(&node(state)), "{state} should be returnable");
        }
    }

    #[test]
    fn changes_only_prunes_untouched_and_ignored() {
        let resolver = FilteringResolver::new(FilteringConfig::changes_only());
        assert!(!resolver.is_returnable(&node(DiffState::Untouched)));
        assert!(!resolver.is_returnable(&node(DiffState::Ignored)));
        assert!(resolver.is_returnable(&node(DiffState::Changed)));
        assert!(resolver.is_returnable(&node(DiffState::Circular)));
    }

    #[test]
    fn omit_removes_single_state() {
        let config = FilteringConfig::default().omit(DiffState::Ignored);
        assert!(!config.returnable_states.contains(&DiffState::Ignored));
        assert_eq!(config.returnable_states.len(), 5);
    }
}

//! Inclusion and exclusion rules.
//!
//! The ignore check runs on a candidate node before any value is resolved,
//! so rules can only look at the node's path and selector. An ignored node
//! is never compared and its subtree is never visited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use odiff_types::NodePath;

use crate::node::DiffNode;

/// Decides whether a location is excluded from comparison.
pub trait IsIgnoredResolver: Send + Sync {
    fn is_ignored(&self, node: &DiffNode) -> bool;
}

/// Declarative inclusion rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InclusionConfig {
    /// Paths whose node and subtree are ignored.
    pub excluded_paths: Vec<NodePath>,
    /// Record property names ignored wherever they appear.
    pub excluded_properties: BTreeSet<String>,
    /// When non-empty, only these paths, their ancestors, and their
    /// descendants are compared.
    pub included_paths: Vec<NodePath>,
}

impl InclusionConfig {
    pub fn exclude_path(mut self, path: NodePath) -> Self {
        self.excluded_paths.push(path);
        self
    }

    pub fn exclude_property(mut self, name: impl Into<String>) -> Self {
        self.excluded_properties.insert(name.into());
        self
    }

    pub fn include_path(mut self, path: NodePath) -> Self {
        self.included_paths.push(path);
        self
    }
}

/// [`IsIgnoredResolver`] backed by an [`InclusionConfig`].
#[derive(Clone, Debug, Default)]
pub struct InclusionResolver {
    config: InclusionConfig,
}

impl InclusionResolver {
    pub fn new(config: InclusionConfig) -> Self {
        Self { config }
    }

    fn is_excluded(&self, path: &NodePath) -> bool {
        self.config
            .excluded_paths
            .iter()
            .any(|excluded| path.starts_with(excluded))
    }

    fn is_included(&self, path: &NodePath) -> bool {
        self.config.included_paths.is_empty()
            || self
                .config
                .included_paths
                .iter()
                .any(|included| path.starts_with(included) || included.starts_with(path))
    }
}

impl IsIgnoredResolver for InclusionResolver {
    fn is_ignored(&self, node: &DiffNode) -> bool {
        if node.path().is_root() {
            return false;
        }
        if let Some(name) = node.element().property_name() {
            if self.config.excluded_properties.contains(name) {
                return true;
            }
        }
        self.is_excluded(node.path()) || !self.is_included(node.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odiff_types::ElementSelector;

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    fn node(s: &str) -> DiffNode {
        let p = path(s);
        DiffNode::candidate(None, p.last_element().clone(), p)
    }

    #[test]
    fn default_ignores_nothing() {
        let resolver = InclusionResolver::default();
        assert!(!resolver.is_ignored(&node("/a")));
        assert!(!resolver.is_ignored(&node("/a/b[1]")));
    }

    #[test]
    fn excluded_path_covers_subtree() {
        let resolver = InclusionResolver::new(InclusionConfig::default().exclude_path(path("/a")));
        assert!(resolver.is_ignored(&node("/a")));
        assert!(resolver.is_ignored(&node("/a/b")));
        assert!(!resolver.is_ignored(&node("/ab")));
        assert!(!resolver.is_ignored(&node("/b")));
    }

    #[test]
    fn excluded_property_matches_anywhere() {
        let resolver =
            InclusionResolver::new(InclusionConfig::default().exclude_property("secret"));
        assert!(resolver.is_ignored(&node("/secret")));
        assert!(resolver.is_ignored(&node("/x/y/secret")));
        assert!(!resolver.is_ignored(&node("/m{secret}")));
    }

    #[test]
    fn included_paths_keep_ancestors_and_descendants() {
        let resolver =
            InclusionResolver::new(InclusionConfig::default().include_path(path("/a/b")));
        assert!(!resolver.is_ignored(&node("/a")));
        assert!(!resolver.is_ignored(&node("/a/b")));
        assert!(!resolver.is_ignored(&node("/a/b/c")));
        assert!(resolver.is_ignored(&node("/a/x")));
        assert!(resolver.is_ignored(&node("/z")));
    }

    #[test]
    fn root_is_never_ignored() {
        let resolver = InclusionResolver::new(
            InclusionConfig::default().exclude_path(NodePath::root()),
        );
        let root = DiffNode::candidate(None, ElementSelector::Root, NodePath::root());
        assert!(!resolver.is_ignored(&root));
    }
}

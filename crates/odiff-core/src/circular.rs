//! Circular reference detection.
//!
//! A [`CircularReferenceDetector`] is a stack of the containers currently
//! open on one side of the traversal, each paired with the path at which it
//! was entered. Pushing a container that is already open signals a
//! [`CircularReference`] carrying the original path.

use serde::{Deserialize, Serialize};
use tracing::warn;

use odiff_types::{NodePath, ObjectIdentity, Value};

use crate::node::DiffNode;

/// How the detector recognises a container it has already entered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircularReferenceMatchingMode {
    /// Same allocation.
    #[default]
    Identity,
    /// Structurally equal under [`Value::deep_equals`].
    EqualityMethod,
}

/// Signal raised when an open container is entered again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircularReference {
    /// Where the container was first entered on the current branch.
    pub path: NodePath,
}

#[derive(Debug)]
struct Entry {
    identity: ObjectIdentity,
    handle: Value,
    path: NodePath,
}

/// Stack of open containers for one side of a comparison.
///
/// Scalars and nulls carry no identity and are never tracked.
#[derive(Debug)]
pub struct CircularReferenceDetector {
    mode: CircularReferenceMatchingMode,
    stack: Vec<Entry>,
}

impl CircularReferenceDetector {
    pub fn new(mode: CircularReferenceMatchingMode) -> Self {
        Self {
            mode,
            stack: Vec::new(),
        }
    }

    pub fn mode(&self) -> CircularReferenceMatchingMode {
        self.mode
    }

    /// Record that `value` is now being compared at `path`.
    pub fn push(&mut self, value: &Value, path: &NodePath) -> Result<(), CircularReference> {
        let Some(identity) = value.identity() else {
            return Ok(());
        };
        if let Some(entry) = self.stack.iter().find(|e| self.is_match(e, identity, value)) {
            return Err(CircularReference {
                path: entry.path.clone(),
            });
        }
        self.stack.push(Entry {
            identity,
            handle: value.clone(),
            path: path.clone(),
        });
        Ok(())
    }

    /// Forget the most recent entry for exactly this container.
    pub fn remove(&mut self, value: &Value) {
        let Some(identity) = value.identity() else {
            return;
        };
        match self.stack.iter().rposition(|e| e.identity == identity) {
            Some(pos) => {
                if pos + 1 != self.stack.len() {
                    warn!(path = %self.stack[pos].path, "circular reference stack unwound out of order");
                }
                self.stack.remove(pos);
            }
            None => warn!(identity = %identity, "removing a value that was never pushed"),
        }
    }

    /// Returns `true` if `value` is currently open under the matching mode.
    pub fn knows(&self, value: &Value) -> bool {
        match value.identity() {
            Some(identity) => self.stack.iter().any(|e| self.is_match(e, identity, value)),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    fn is_match(&self, entry: &Entry, identity: ObjectIdentity, value: &Value) -> bool {
        match self.mode {
            CircularReferenceMatchingMode::Identity => entry.identity == identity,
            CircularReferenceMatchingMode::EqualityMethod => {
                entry.identity == identity || entry.handle.deep_equals(value)
            }
        }
    }
}

/// Observer notified with each finalised [`DiffState::Circular`](crate::DiffState::Circular) node.
pub trait CircularReferenceHandler: Send + Sync {
    fn on_circular_reference(&self, node: &DiffNode);
}

impl<F> CircularReferenceHandler for F
where
    F: Fn(&DiffNode) + Send + Sync,
{
    fn on_circular_reference(&self, node: &DiffNode) {
        self(node)
    }
}

/// Default handler: logs a warning and leaves the node untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingCircularReferenceHandler;

impl CircularReferenceHandler for LoggingCircularReferenceHandler {
    fn on_circular_reference(&self, node: &DiffNode) {
        let start = node
            .circle_start_path()
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(
            path = %node.path(),
            circle_start = %start,
            resolved = node.circle_start_node().is_some(),
            "detected circular reference"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odiff_types::Record;

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    fn thing(name: &str) -> Value {
        Value::record(Record::new("Thing").with_field("name", name))
    }

    #[test]
    fn push_same_object_twice_signals_first_path() {
        let mut detector = CircularReferenceDetector::new(CircularReferenceMatchingMode::Identity);
        let a = thing("a");
        detector.push(&a, &path("/")).unwrap();
        detector.push(&thing("b"), &path("/b")).unwrap();
        let err = detector.push(&a, &path("/b/a")).unwrap_err();
        assert_eq!(err.path, path("/"));
    }

    #[test]
    fn identity_mode_ignores_equal_distinct_objects() {
        let mut detector = CircularReferenceDetector::new(CircularReferenceMatchingMode::Identity);
        detector.push(&thing("foo"), &path("/")).unwrap();
        assert!(detector.push(&thing("foo"), &path("/child")).is_ok());
        assert_eq!(detector.len(), 2);
    }

    #[test]
    fn equality_mode_matches_equal_distinct_objects() {
        let mut detector =
            CircularReferenceDetector::new(CircularReferenceMatchingMode::EqualityMethod);
        detector.push(&thing("foo"), &path("/")).unwrap();
        let err = detector.push(&thing("foo"), &path("/child")).unwrap_err();
        assert_eq!(err.path, path("/"));
        assert!(detector.push(&thing("bar"), &path("/other")).is_ok());
    }

    #[test]
    fn remove_allows_reentry() {
        let mut detector = CircularReferenceDetector::new(CircularReferenceMatchingMode::Identity);
        let a = thing("a");
        detector.push(&a, &path("/x")).unwrap();
        detector.remove(&a);
        assert!(detector.is_empty());
        assert!(!detector.knows(&a));
        assert!(detector.push(&a, &path("/y")).is_ok());
    }

    #[test]
    fn scalars_and_nulls_are_not_tracked() {
        let mut detector =
            CircularReferenceDetector::new(CircularReferenceMatchingMode::EqualityMethod);
        detector.push(&Value::from("x"), &path("/")).unwrap();
        detector.push(&Value::from("x"), &path("/a")).unwrap();
        detector.push(&Value::Null, &path("/b")).unwrap();
        assert!(detector.is_empty());
        detector.remove(&Value::Null);
    }

    #[test]
    fn closures_are_handlers() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = AtomicUsize::new(0);
        let handler = |_: &DiffNode| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        let node = DiffNode::candidate(None, odiff_types::ElementSelector::Root, path("/"));
        handler.on_circular_reference(&node);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn matching_mode_serde_names() {
        let json = serde_json::to_string(&CircularReferenceMatchingMode::EqualityMethod).unwrap();
        assert_eq!(json, "\"equality_method\"");
    }
}

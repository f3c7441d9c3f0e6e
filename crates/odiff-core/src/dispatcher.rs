//! Recursive dispatch: the traversal that ties differs together.
//!
//! Every location of the compared graphs passes through
//! [`Dispatcher::dispatch`]. The dispatcher applies inclusion rules,
//! short-circuits locations that are absent on both sides, tracks the open
//! containers of each side to catch cycles, selects a differ for the
//! resolved type, and attaches the finished node to its parent when the
//! returnability policy accepts it.
//!
//! All mutable traversal state lives in a [`DiffContext`] created per
//! top-level comparison, so one dispatcher can serve concurrent comparisons.

use tracing::debug;

use odiff_types::{ElementSelector, NodePath};

use crate::accessor::Accessor;
use crate::circular::{
    CircularReference, CircularReferenceDetector, CircularReferenceHandler,
    CircularReferenceMatchingMode,
};
use crate::differ::DifferProvider;
use crate::error::{DiffError, DiffResult};
use crate::filtering::IsReturnableResolver;
use crate::inclusion::IsIgnoredResolver;
use crate::instances::Instances;
use crate::node::{DiffNode, DiffState, DiffTree, NodeArena, NodeId};

// ---------------------------------------------------------------------------
// DiffContext
// ---------------------------------------------------------------------------

/// Traversal state of one top-level comparison: the node arena and the
/// circular reference stacks of both sides.
///
/// Differs use it to create nodes and set their states. The cycle stacks
/// are private to the dispatcher.
#[derive(Debug)]
pub struct DiffContext {
    arena: NodeArena,
    working_detector: CircularReferenceDetector,
    base_detector: CircularReferenceDetector,
}

impl DiffContext {
    fn new(mode: CircularReferenceMatchingMode) -> Self {
        Self {
            arena: NodeArena::default(),
            working_detector: CircularReferenceDetector::new(mode),
            base_detector: CircularReferenceDetector::new(mode),
        }
    }

    /// Create the node for `instances` under `parent`.
    pub fn new_node(&mut self, parent: Option<NodeId>, instances: &Instances) -> NodeId {
        let path = self.path_for(parent, instances.element());
        let node = DiffNode::candidate(parent, instances.element().clone(), path).with_values(
            instances.value_type().clone(),
            instances.working().clone(),
            instances.base().clone(),
        );
        self.arena.insert(node)
    }

    pub fn node(&self, id: NodeId) -> &DiffNode {
        self.arena.get(id)
    }

    pub fn set_state(&mut self, id: NodeId, state: DiffState) {
        self.arena.get_mut(id).set_state(state);
    }

    /// Returns `true` if `id` or any attached descendant is a change.
    pub fn has_changes(&self, id: NodeId) -> bool {
        self.arena.has_changes(id)
    }

    /// Number of containers currently open on both sides.
    pub fn tracked_instances(&self) -> usize {
        self.working_detector.len() + self.base_detector.len()
    }

    /// Number of nodes created so far, attached or not.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Finish the traversal, producing a tree rooted at `root`.
    pub fn into_tree(self, root: NodeId) -> DiffTree {
        DiffTree::new(self.arena, root)
    }

    fn path_for(&self, parent: Option<NodeId>, element: &ElementSelector) -> NodePath {
        let parent_path = match parent {
            Some(id) => self.arena.get(id).path().clone(),
            None => NodePath::root(),
        };
        parent_path.with_child(element.clone())
    }

    fn reset_instance_memory(&mut self) {
        self.working_detector.clear();
        self.base_detector.clear();
    }

    fn remember_instances(
        &mut self,
        instances: &Instances,
        path: &NodePath,
    ) -> Result<(), CircularReference> {
        self.working_detector.push(instances.working(), path)?;
        if let Err(signal) = self.base_detector.push(instances.base(), path) {
            self.working_detector.remove(instances.working());
            return Err(signal);
        }
        Ok(())
    }

    fn forget_instances(&mut self, instances: &Instances) {
        self.working_detector.remove(instances.working());
        self.base_detector.remove(instances.base());
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Delegates each location to the differ registered for its type.
pub struct Dispatcher {
    differ_provider: DifferProvider,
    circular_reference_handler: Box<dyn CircularReferenceHandler>,
    ignored_resolver: Box<dyn IsIgnoredResolver>,
    returnable_resolver: Box<dyn IsReturnableResolver>,
    matching_mode: CircularReferenceMatchingMode,
    max_depth: Option<usize>,
}

impl Dispatcher {
    pub fn new(
        differ_provider: DifferProvider,
        circular_reference_handler: Box<dyn CircularReferenceHandler>,
        ignored_resolver: Box<dyn IsIgnoredResolver>,
        returnable_resolver: Box<dyn IsReturnableResolver>,
        matching_mode: CircularReferenceMatchingMode,
        max_depth: Option<usize>,
    ) -> Self {
        Self {
            differ_provider,
            circular_reference_handler,
            ignored_resolver,
            returnable_resolver,
            matching_mode,
            max_depth,
        }
    }

    /// Fresh traversal state for one top-level comparison.
    pub fn new_context(&self) -> DiffContext {
        DiffContext::new(self.matching_mode)
    }

    pub fn matching_mode(&self) -> CircularReferenceMatchingMode {
        self.matching_mode
    }

    pub fn differ_provider(&self) -> &DifferProvider {
        &self.differ_provider
    }

    /// Compare the location reached by applying `accessor` to
    /// `parent_instances`, and attach the resulting node to `parent` if it is
    /// returnable.
    ///
    /// A call without a parent starts a fresh comparison: the cycle stacks of
    /// `context` are cleared before returning, whatever the outcome.
    pub fn dispatch(
        &self,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        parent_instances: &Instances,
        accessor: &dyn Accessor,
    ) -> DiffResult<NodeId> {
        let result = self.compare(context, parent, parent_instances, accessor);
        if parent.is_none() {
            context.reset_instance_memory();
        }
        let node = result?;

        if let Some(parent) = parent {
            if self.returnable_resolver.is_returnable(context.node(node)) {
                context.arena.add_child(parent, node);
            }
        }
        Ok(node)
    }

    fn compare(
        &self,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        parent_instances: &Instances,
        accessor: &dyn Accessor,
    ) -> DiffResult<NodeId> {
        let element = accessor.element();
        let path = context.path_for(parent, &element);

        let mut candidate = DiffNode::candidate(parent, element, path.clone());
        if self.ignored_resolver.is_ignored(&candidate) {
            candidate.set_state(DiffState::Ignored);
            return Ok(context.arena.insert(candidate));
        }

        let instances = parent_instances.access(accessor);
        if instances.are_null() {
            return Ok(context.new_node(parent, &instances));
        }

        if let Some(max) = self.max_depth {
            if path.depth() > max {
                return Err(DiffError::DepthLimitExceeded { path, max });
            }
        }

        self.compare_with_circular_reference_tracking(context, parent, &instances)
    }

    fn compare_with_circular_reference_tracking(
        &self,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        instances: &Instances,
    ) -> DiffResult<NodeId> {
        let path = context.path_for(parent, instances.element());

        match context.remember_instances(instances, &path) {
            Ok(()) => {
                let result = self.compare_instances(context, parent, instances);
                context.forget_instances(instances);
                result
            }
            Err(CircularReference { path: circle_start }) => {
                let node = new_circular_node(context, parent, instances, circle_start);
                self.circular_reference_handler
                    .on_circular_reference(context.node(node));
                Ok(node)
            }
        }
    }

    fn compare_instances(
        &self,
        context: &mut DiffContext,
        parent: Option<NodeId>,
        instances: &Instances,
    ) -> DiffResult<NodeId> {
        let value_type = instances.value_type();
        let differ = self
            .differ_provider
            .retrieve_differ_for_type(value_type)
            .ok_or_else(|| DiffError::NoDifferForType(value_type.clone()))?;
        debug!(differ = differ.name(), value_type = %value_type, "dispatching to differ");
        differ.compare(self, context, parent, instances)
    }
}

fn new_circular_node(
    context: &mut DiffContext,
    parent: Option<NodeId>,
    instances: &Instances,
    circle_start: NodePath,
) -> NodeId {
    let circle_start_node = context.arena.find_ancestor(parent, &circle_start);
    let node = context.new_node(parent, instances);
    context
        .arena
        .get_mut(node)
        .set_circle_start(circle_start, circle_start_node);
    node
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::accessor::{PropertyAccessor, RootAccessor};
    use crate::circular::LoggingCircularReferenceHandler;
    use crate::differ::Differ;
    use crate::filtering::FilteringResolver;
    use crate::inclusion::{InclusionConfig, InclusionResolver};
    use odiff_types::{Record, Value, ValueType};

    fn dispatcher(mode: CircularReferenceMatchingMode) -> Dispatcher {
        Dispatcher::new(
            DifferProvider::with_defaults(),
            Box::new(LoggingCircularReferenceHandler),
            Box::new(InclusionResolver::default()),
            Box::new(FilteringResolver::default()),
            mode,
            None,
        )
    }

    fn self_referencing(name: &str) -> Value {
        let v = Value::record(Record::new("Node").with_field("name", name));
        v.set_field("child", v.clone());
        v
    }

    fn run(d: &Dispatcher, working: &Value, base: &Value) -> (DiffContext, NodeId) {
        let mut ctx = d.new_context();
        let root = d
            .dispatch(
                &mut ctx,
                None,
                &Instances::of(working.clone(), base.clone()),
                &RootAccessor,
            )
            .unwrap();
        (ctx, root)
    }

    #[test]
    fn stacks_are_empty_after_top_level_dispatch() {
        let d = dispatcher(CircularReferenceMatchingMode::Identity);
        let (ctx, _) = run(&d, &self_referencing("foo"), &Value::Null);
        assert_eq!(ctx.tracked_instances(), 0);
    }

    #[test]
    fn shared_context_does_not_leak_between_comparisons() {
        let d = dispatcher(CircularReferenceMatchingMode::Identity);
        let mut ctx = d.new_context();
        let first = self_referencing("foo");
        d.dispatch(&mut ctx, None, &Instances::of(first.clone(), Value::Null), &RootAccessor)
            .unwrap();
        assert_eq!(ctx.tracked_instances(), 0);

        // Re-comparing a value seen by the first comparison must not be
        // reported as circular at the root.
        let holder = Value::record(Record::new("Holder").with_field("inner", first.clone()));
        let root = d
            .dispatch(&mut ctx, None, &Instances::of(holder, Value::Null), &RootAccessor)
            .unwrap();
        assert_eq!(ctx.node(root).state(), DiffState::Added);
        let inner = ctx
            .node(root)
            .children()
            .iter()
            .map(|c| ctx.node(*c))
            .find(|n| n.element() == &ElementSelector::property("inner"))
            .unwrap();
        assert_eq!(inner.state(), DiffState::Added);
        assert_eq!(ctx.tracked_instances(), 0);
    }

    #[test]
    fn circular_node_resolves_ancestor() {
        let d = dispatcher(CircularReferenceMatchingMode::Identity);
        let (ctx, root) = run(&d, &self_referencing("foo"), &Value::Null);
        let tree = ctx.into_tree(root);
        let child = tree.child_property("child").unwrap();
        assert!(child.is_circular());
        assert_eq!(child.circle_start_path(), Some(&NodePath::root()));
        assert_eq!(child.circle_start_node(), Some(root));
        assert_eq!(child.value_type(), Some(&ValueType::Record("Node".into())));
    }

    #[test]
    fn base_side_cycle_is_detected_without_working_cycle() {
        let d = dispatcher(CircularReferenceMatchingMode::Identity);
        let working = Value::record(
            Record::new("Node")
                .with_field("name", "foo")
                .with_field("child", Record::new("Node").with_field("name", "foo")),
        );
        let (ctx, root) = run(&d, &working, &self_referencing("foo"));
        let tree = ctx.into_tree(root);
        let child = tree.child_property("child").unwrap();
        assert!(child.is_circular());
        assert_eq!(child.circle_start_path(), Some(&NodePath::root()));
    }

    #[test]
    fn ignored_location_is_never_tracked_or_compared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let d = Dispatcher::new(
            DifferProvider::with_defaults(),
            Box::new(move |_: &DiffNode| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(InclusionResolver::new(
                InclusionConfig::default().exclude_path("/child".parse().unwrap()),
            )),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            None,
        );
        let (ctx, root) = run(&d, &self_referencing("foo"), &Value::Null);
        let tree = ctx.into_tree(root);
        let child = tree.child_property("child").unwrap();
        assert!(child.is_ignored());
        assert!(child.value_type().is_none());
        assert!(!child.has_children());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn circular_handler_is_invoked_once_per_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let d = Dispatcher::new(
            DifferProvider::with_defaults(),
            Box::new(move |node: &DiffNode| {
                assert!(node.is_circular());
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(InclusionResolver::default()),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            None,
        );
        run(&d, &self_referencing("foo"), &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_fallback_is_fatal() {
        let d = Dispatcher::new(
            DifferProvider::new(),
            Box::new(LoggingCircularReferenceHandler),
            Box::new(InclusionResolver::default()),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            None,
        );
        let mut ctx = d.new_context();
        let err = d
            .dispatch(
                &mut ctx,
                None,
                &Instances::of(Value::from(1), Value::from(2)),
                &RootAccessor,
            )
            .unwrap_err();
        assert!(matches!(err, DiffError::NoDifferForType(ValueType::Integer)));
        assert_eq!(ctx.tracked_instances(), 0);
    }

    struct FailingDiffer;

    impl Differ for FailingDiffer {
        fn name(&self) -> &str {
            "failing"
        }

        fn accepts(&self, value_type: &ValueType) -> bool {
            *value_type == ValueType::Text
        }

        fn compare(
            &self,
            _dispatcher: &Dispatcher,
            _context: &mut DiffContext,
            _parent: Option<NodeId>,
            _instances: &Instances,
        ) -> DiffResult<NodeId> {
            Err(DiffError::strategy("failing", "boom"))
        }
    }

    #[test]
    fn strategy_failure_propagates_and_unwinds_stacks() {
        let mut provider = DifferProvider::with_defaults();
        provider.register(Box::new(FailingDiffer));
        let d = Dispatcher::new(
            provider,
            Box::new(LoggingCircularReferenceHandler),
            Box::new(InclusionResolver::default()),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            None,
        );
        let working = Value::record(Record::new("T").with_field("name", "x"));
        let mut ctx = d.new_context();
        let err = d
            .dispatch(&mut ctx, None, &Instances::of(working, Value::Null), &RootAccessor)
            .unwrap_err();
        assert!(matches!(err, DiffError::Strategy { .. }));
        assert_eq!(ctx.tracked_instances(), 0);
    }

    #[test]
    fn nested_dispatch_pops_its_own_entries() {
        let d = dispatcher(CircularReferenceMatchingMode::Identity);
        let shared = Value::record(Record::new("Leaf").with_field("v", 1));
        let parent = Value::record(Record::new("P").with_field("x", shared.clone()));
        let mut ctx = d.new_context();
        let instances = Instances::of(parent, Value::Null);
        let root = ctx.new_node(None, &instances);
        d.dispatch(&mut ctx, Some(root), &instances, &PropertyAccessor::new("x"))
            .unwrap();
        assert_eq!(ctx.tracked_instances(), 0);

        // The sibling visit of the same object is not a cycle.
        let again = d
            .dispatch(&mut ctx, Some(root), &instances, &PropertyAccessor::new("x"))
            .unwrap();
        assert_eq!(ctx.node(again).state(), DiffState::Added);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let d = Dispatcher::new(
            DifferProvider::with_defaults(),
            Box::new(LoggingCircularReferenceHandler),
            Box::new(InclusionResolver::default()),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            Some(1),
        );
        let deep = Value::record(
            Record::new("A").with_field("b", Record::new("B").with_field("c", 1)),
        );
        let mut ctx = d.new_context();
        let err = d
            .dispatch(&mut ctx, None, &Instances::of(deep, Value::Null), &RootAccessor)
            .unwrap_err();
        match err {
            DiffError::DepthLimitExceeded { path, max } => {
                assert_eq!(path.to_string(), "/b/c");
                assert_eq!(max, 1);
            }
            other => panic!("expected DepthLimitExceeded, got {other:?}"),
        }
        assert_eq!(ctx.tracked_instances(), 0);
    }

    #[test]
    fn depth_limit_skips_ignored_and_absent_locations() {
        let d = Dispatcher::new(
            DifferProvider::with_defaults(),
            Box::new(LoggingCircularReferenceHandler),
            Box::new(InclusionResolver::new(
                InclusionConfig::default().exclude_path("/a/b".parse().unwrap()),
            )),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            Some(1),
        );
        let working = Value::record(
            Record::new("T")
                .with_field("a", Record::new("A").with_field("b", 1))
                .with_field("c", Record::new("C").with_field("d", Value::Null)),
        );
        let (ctx, root) = run(&d, &working, &Value::Null);
        let tree = ctx.into_tree(root);
        assert!(tree.find(&"/a/b".parse().unwrap()).unwrap().is_ignored());
        let d_node = tree.find(&"/c/d".parse().unwrap()).unwrap();
        assert!(d_node.is_untouched());
        assert!(d_node.working().is_null());
    }

    /// Dispatches the `child` property under a detached sibling node instead
    /// of the node created for the record itself.
    struct DetachingDiffer;

    impl Differ for DetachingDiffer {
        fn name(&self) -> &str {
            "detaching"
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
            let detached = context.new_node(
                parent,
                &instances.access(&PropertyAccessor::new("detached")),
            );
            dispatcher.dispatch(context, Some(detached), instances, &PropertyAccessor::new("child"))?;
            context.set_state(node, DiffState::Changed);
            Ok(node)
        }
    }

    #[test]
    fn circular_node_without_reachable_ancestor_keeps_start_path() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut provider = DifferProvider::with_defaults();
        provider.register(Box::new(DetachingDiffer));
        let d = Dispatcher::new(
            provider,
            Box::new(move |node: &DiffNode| {
                sink.lock().unwrap().push((
                    node.path().clone(),
                    node.circle_start_path().cloned(),
                    node.circle_start_node(),
                ));
            }),
            Box::new(InclusionResolver::default()),
            Box::new(FilteringResolver::default()),
            CircularReferenceMatchingMode::Identity,
            None,
        );
        let (ctx, _) = run(&d, &self_referencing("foo"), &Value::Null);
        assert_eq!(ctx.tracked_instances(), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (path, start_path, start_node) = &seen[0];
        assert_eq!(path.to_string(), "/detached/child");
        assert_eq!(start_path.as_ref(), Some(&NodePath::root()));
        assert_eq!(*start_node, None);
    }
}

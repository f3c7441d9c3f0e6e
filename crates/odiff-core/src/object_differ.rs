use tracing::debug;

use odiff_types::Value;

use crate::accessor::RootAccessor;
use crate::circular::{CircularReferenceHandler, LoggingCircularReferenceHandler};
use crate::config::DifferConfig;
use crate::differ::{Differ, DifferProvider};
use crate::dispatcher::Dispatcher;
use crate::error::DiffResult;
use crate::filtering::{FilteringResolver, IsReturnableResolver};
use crate::inclusion::{InclusionResolver, IsIgnoredResolver};
use crate::instances::Instances;
use crate::node::DiffTree;

// ---------------------------------------------------------------------------
// ObjectDiffer
// ---------------------------------------------------------------------------

/// Entry point for all comparisons.
///
/// An `ObjectDiffer` holds only configuration and collaborators; each call to
/// [`Self::compare`] runs with its own traversal state, so a single differ
/// can be shared between threads.
pub struct ObjectDiffer {
    dispatcher: Dispatcher,
    config: DifferConfig,
}

impl ObjectDiffer {
    /// A differ with the built-in differs and resolvers derived from `config`.
    pub fn new(config: DifferConfig) -> Self {
        ObjectDifferBuilder::new().config(config).build()
    }

    pub fn builder() -> ObjectDifferBuilder {
        ObjectDifferBuilder::new()
    }

    /// The configuration this differ was built from.
    pub fn config(&self) -> &DifferConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Recursively compare `working` (the successor) against `base` (the
    /// predecessor). Either side may be [`Value::Null`].
    pub fn compare(&self, working: &Value, base: &Value) -> DiffResult<DiffTree> {
        let mut context = self.dispatcher.new_context();
        let instances = Instances::of(working.clone(), base.clone());
        let root = self
            .dispatcher
            .dispatch(&mut context, None, &instances, &RootAccessor)?;
        let created = context.node_count();
        let tree = context.into_tree(root);
        debug!(created, root_state = %tree.root_node().state(), "comparison complete");
        Ok(tree)
    }
}

impl Default for ObjectDiffer {
    fn default() -> Self {
        Self::new(DifferConfig::default())
    }
}

// ---------------------------------------------------------------------------
// ObjectDifferBuilder
// ---------------------------------------------------------------------------

/// Assembles an [`ObjectDiffer`].
///
/// Resolvers not set explicitly are derived from the configuration's
/// inclusion and filtering sections.
pub struct ObjectDifferBuilder {
    config: DifferConfig,
    provider: DifferProvider,
    custom_differs: Vec<Box<dyn Differ>>,
    circular_reference_handler: Box<dyn CircularReferenceHandler>,
    ignored_resolver: Option<Box<dyn IsIgnoredResolver>>,
    returnable_resolver: Option<Box<dyn IsReturnableResolver>>,
}

impl ObjectDifferBuilder {
    pub fn new() -> Self {
        Self {
            config: DifferConfig::default(),
            provider: DifferProvider::with_defaults(),
            custom_differs: Vec::new(),
            circular_reference_handler: Box::new(LoggingCircularReferenceHandler),
            ignored_resolver: None,
            returnable_resolver: None,
        }
    }

    pub fn config(mut self, config: DifferConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a differ ahead of the built-ins. Later registrations take
    /// priority over earlier ones.
    pub fn differ(mut self, differ: Box<dyn Differ>) -> Self {
        self.custom_differs.push(differ);
        self
    }

    /// Replace the built-in provider entirely.
    pub fn differ_provider(mut self, provider: DifferProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn circular_reference_handler(
        mut self,
        handler: impl CircularReferenceHandler + 'static,
    ) -> Self {
        self.circular_reference_handler = Box::new(handler);
        self
    }

    pub fn ignored_resolver(mut self, resolver: impl IsIgnoredResolver + 'static) -> Self {
        self.ignored_resolver = Some(Box::new(resolver));
        self
    }

    pub fn returnable_resolver(mut self, resolver: impl IsReturnableResolver + 'static) -> Self {
        self.returnable_resolver = Some(Box::new(resolver));
        self
    }

    pub fn build(self) -> ObjectDiffer {
        let mut provider = self.provider;
        for differ in self.custom_differs {
            provider.register(differ);
        }

        let ignored_resolver = self
            .ignored_resolver
            .unwrap_or_else(|| Box::new(InclusionResolver::new(self.config.inclusion.clone())));
        let returnable_resolver = self
            .returnable_resolver
            .unwrap_or_else(|| Box::new(FilteringResolver::new(self.config.filtering.clone())));

        let dispatcher = Dispatcher::new(
            provider,
            self.circular_reference_handler,
            ignored_resolver,
            returnable_resolver,
            self.config.circular_references.matching_mode,
            self.config.max_depth,
        );

        ObjectDiffer {
            dispatcher,
            config: self.config,
        }
    }
}

impl Default for ObjectDifferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

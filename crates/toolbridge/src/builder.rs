//! Registration phase: collect handlers, middleware and options, then freeze.

use crate::dispatch::Dispatcher;
use crate::error::AdapterResult;
use crate::middleware::{
    Chains, MiddlewareBundle, PromptMiddleware, ResourceMiddleware, ToolMiddleware,
};
use crate::options::AdapterOption;
use crate::registry::{PromptFn, Registry, ResourceFn, ToolFn};
use crate::types::{InputSchema, PromptArgument};

/// Adapter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Nothing registered yet.
    Created,
    /// Registration and middleware calls are accepted.
    Registering,
    /// Effective handlers are fixed and serving.
    Running,
    /// Transport stopped; no further requests are dispatched.
    Terminated,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Lifecycle::Created => "created",
            Lifecycle::Registering => "registering",
            Lifecycle::Running => "running",
            Lifecycle::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Callback run against the final registry when the builder is frozen.
pub type BuildHook = Box<dyn FnOnce(&Registry) + Send>;

#[derive(Default)]
struct BuildHooks(Vec<BuildHook>);

impl std::fmt::Debug for BuildHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuildHooks({})", self.0.len())
    }
}

/// Mutable setup state. [`AdapterBuilder::build`] consumes it, so nothing
/// can be registered once a [`Dispatcher`] exists.
#[derive(Debug, Default)]
pub struct AdapterBuilder {
    registry: Registry,
    chains: Chains,
    logger: Option<tracing::Dispatch>,
    hooks: BuildHooks,
    touched: bool,
}

impl AdapterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = AdapterOption>) -> Self {
        for option in options {
            self.apply(option);
        }
        self
    }

    pub fn apply(&mut self, option: AdapterOption) {
        self.touched = true;
        match option {
            AdapterOption::Logger(dispatch) => self.logger = Some(dispatch),
            AdapterOption::ToolMiddleware(m) => self.chains.add_tool_middleware(m),
            AdapterOption::PromptMiddleware(m) => self.chains.add_prompt_middleware(m),
            AdapterOption::ResourceMiddleware(m) => self.chains.add_resource_middleware(m),
            AdapterOption::Bundle(bundle) => self.chains.apply_bundle(bundle.as_ref()),
            AdapterOption::Chains(configure) => configure(&mut self.chains),
        }
    }

    pub fn state(&self) -> Lifecycle {
        if self.touched || !self.registry.is_empty() {
            Lifecycle::Registering
        } else {
            Lifecycle::Created
        }
    }

    pub fn register_tool(
        &mut self,
        name: &str,
        description: &str,
        schema: InputSchema,
        handler: impl Into<Option<ToolFn>>,
    ) -> AdapterResult<()> {
        self.touched = true;
        self.registry
            .register_tool(name, description, schema, handler)
    }

    pub fn register_prompt(
        &mut self,
        name: &str,
        description: &str,
        handler: impl Into<Option<PromptFn>>,
    ) -> AdapterResult<()> {
        self.touched = true;
        self.registry.register_prompt(name, description, handler)
    }

    pub fn register_prompt_with_arguments(
        &mut self,
        name: &str,
        description: &str,
        arguments: Vec<PromptArgument>,
        handler: impl Into<Option<PromptFn>>,
    ) -> AdapterResult<()> {
        self.touched = true;
        self.registry
            .register_prompt_with_arguments(name, description, arguments, handler)
    }

    pub fn register_resource(
        &mut self,
        uri: &str,
        name: &str,
        description: &str,
        mime_type: &str,
        handler: impl Into<Option<ResourceFn>>,
    ) -> AdapterResult<()> {
        self.touched = true;
        self.registry
            .register_resource(uri, name, description, mime_type, handler)
    }

    pub fn add_tool_middleware(&mut self, middleware: ToolMiddleware) {
        self.touched = true;
        self.chains.add_tool_middleware(middleware);
    }

    pub fn add_prompt_middleware(&mut self, middleware: PromptMiddleware) {
        self.touched = true;
        self.chains.add_prompt_middleware(middleware);
    }

    pub fn add_resource_middleware(&mut self, middleware: ResourceMiddleware) {
        self.touched = true;
        self.chains.add_resource_middleware(middleware);
    }

    pub fn apply_bundle(&mut self, bundle: &dyn MiddlewareBundle) {
        self.touched = true;
        self.chains.apply_bundle(bundle);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run `hook` with the registry as it stands at [`AdapterBuilder::build`],
    /// after every registration has landed.
    pub fn on_build(&mut self, hook: impl FnOnce(&Registry) + Send + 'static) {
        self.hooks.0.push(Box::new(hook));
    }

    pub fn chains(&self) -> &Chains {
        &self.chains
    }

    /// Freeze registry and chains into the effective handlers.
    pub fn build(self) -> Dispatcher {
        tracing::debug!(
            tools = self.registry.tool_count(),
            prompts = self.registry.prompt_count(),
            resources = self.registry.resource_count(),
            "building dispatcher"
        );
        for hook in self.hooks.0 {
            hook(&self.registry);
        }
        Dispatcher::new(self.registry, &self.chains, self.logger)
    }
}

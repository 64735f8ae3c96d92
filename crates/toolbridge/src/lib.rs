//! Toolbridge: register tool, prompt and resource handlers once and serve
//! them through a protocol runtime or call them directly.
//!
//! Setup happens on an [`AdapterBuilder`]; [`AdapterBuilder::build`] freezes
//! the registry and middleware chains into a [`Dispatcher`] whose effective
//! handlers are shared across concurrently running requests.

pub mod builder;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod options;
pub mod registry;
pub mod types;
pub mod validate;

pub use builder::{AdapterBuilder, BuildHook, Lifecycle};
pub use context::RequestContext;
pub use dispatch::Dispatcher;
pub use error::{AdapterError, AdapterResult, CapabilityKind, ContextFailure, HandlerError};
pub use middleware::{
    around, handler_fn, Chain, Chains, Handler, Middleware, MiddlewareBundle, TracingMiddleware,
};
pub use options::{
    with_bundle, with_chains, with_logger, with_prompt_middleware, with_resource_middleware,
    with_tool_middleware, AdapterOption,
};
pub use registry::{prompt_fn, resource_fn, tool_fn, PromptFn, Registry, ResourceFn, ToolFn};
pub use types::*;

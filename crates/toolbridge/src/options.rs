//! Setup-time options applied to an [`AdapterBuilder`](crate::AdapterBuilder).

use std::fmt;
use std::sync::Arc;

use crate::middleware::{
    Chains, MiddlewareBundle, PromptMiddleware, ResourceMiddleware, ToolMiddleware,
};

/// Every shape of setup option the builder accepts.
pub enum AdapterOption {
    /// Subscriber the effective handlers run under.
    Logger(tracing::Dispatch),
    ToolMiddleware(ToolMiddleware),
    PromptMiddleware(PromptMiddleware),
    ResourceMiddleware(ResourceMiddleware),
    /// Registers one hook per kind.
    Bundle(Arc<dyn MiddlewareBundle>),
    /// Arbitrary edits to the three chains.
    Chains(Box<dyn FnOnce(&mut Chains) + Send>),
}

impl fmt::Debug for AdapterOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterOption::Logger(_) => "Logger",
            AdapterOption::ToolMiddleware(_) => "ToolMiddleware",
            AdapterOption::PromptMiddleware(_) => "PromptMiddleware",
            AdapterOption::ResourceMiddleware(_) => "ResourceMiddleware",
            AdapterOption::Bundle(_) => "Bundle",
            AdapterOption::Chains(_) => "Chains",
        };
        f.write_str(name)
    }
}

pub fn with_logger(dispatch: impl Into<tracing::Dispatch>) -> AdapterOption {
    AdapterOption::Logger(dispatch.into())
}

pub fn with_tool_middleware(middleware: ToolMiddleware) -> AdapterOption {
    AdapterOption::ToolMiddleware(middleware)
}

pub fn with_prompt_middleware(middleware: PromptMiddleware) -> AdapterOption {
    AdapterOption::PromptMiddleware(middleware)
}

pub fn with_resource_middleware(middleware: ResourceMiddleware) -> AdapterOption {
    AdapterOption::ResourceMiddleware(middleware)
}

pub fn with_bundle(bundle: impl MiddlewareBundle + 'static) -> AdapterOption {
    AdapterOption::Bundle(Arc::new(bundle))
}

pub fn with_chains(configure: impl FnOnce(&mut Chains) + Send + 'static) -> AdapterOption {
    AdapterOption::Chains(Box::new(configure))
}

//! Handler composition: per-kind middleware chains and bundles.
//!
//! A middleware turns the next handler into a wrapped handler. A [`Chain`]
//! applies its entries in reverse registration order, so for registrations
//! `[A, B]` the effective handler is `A(B(base))` and the first-registered
//! middleware is outermost:
//!
//! ```text
//! A pre -> B pre -> base -> B post -> A post
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;

use crate::context::RequestContext;
use crate::error::{AdapterResult, CapabilityKind};
use crate::types::{
    CallToolRequest, CallToolResult, GetPromptRequest, GetPromptResult, ReadResourceRequest,
    ReadResourceResult, RequestTarget,
};

/// An effective handler as invoked by the protocol runtime.
pub type Handler<Req, Res> =
    Arc<dyn Fn(RequestContext, Req) -> BoxFuture<'static, AdapterResult<Res>> + Send + Sync>;

/// Wraps the next handler into a decorated handler.
pub type Middleware<Req, Res> = Arc<dyn Fn(Handler<Req, Res>) -> Handler<Req, Res> + Send + Sync>;

pub type ToolCallHandler = Handler<CallToolRequest, CallToolResult>;
pub type PromptGetHandler = Handler<GetPromptRequest, GetPromptResult>;
pub type ResourceReadHandler = Handler<ReadResourceRequest, ReadResourceResult>;

pub type ToolMiddleware = Middleware<CallToolRequest, CallToolResult>;
pub type PromptMiddleware = Middleware<GetPromptRequest, GetPromptResult>;
pub type ResourceMiddleware = Middleware<ReadResourceRequest, ReadResourceResult>;

/// Box an async closure into a [`Handler`].
pub fn handler_fn<Req, Res, F, Fut>(f: F) -> Handler<Req, Res>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AdapterResult<Res>> + Send + 'static,
{
    Arc::new(move |ctx: RequestContext, req: Req| -> BoxFuture<'static, AdapterResult<Res>> {
        Box::pin(f(ctx, req))
    })
}

/// Build a middleware from an async hook that receives the next handler.
///
/// Code before `next(ctx, req).await` is the pre-hook, code after it the
/// post-hook.
pub fn around<Req, Res, F, Fut>(hook: F) -> Middleware<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
    F: Fn(RequestContext, Req, Handler<Req, Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AdapterResult<Res>> + Send + 'static,
{
    let hook = Arc::new(hook);
    Arc::new(move |next: Handler<Req, Res>| -> Handler<Req, Res> {
        let hook = hook.clone();
        Arc::new(
            move |ctx: RequestContext, req: Req| -> BoxFuture<'static, AdapterResult<Res>> {
                Box::pin((*hook)(ctx, req, next.clone()))
            },
        )
    })
}

/// Ordered, append-only list of middleware for one capability kind.
pub struct Chain<Req, Res> {
    entries: Vec<Middleware<Req, Res>>,
}

impl<Req, Res> Chain<Req, Res> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, middleware: Middleware<Req, Res>) {
        self.entries.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compose `base` with every entry; the first entry ends up outermost.
    pub fn wrap(&self, base: Handler<Req, Res>) -> Handler<Req, Res> {
        self.entries
            .iter()
            .rev()
            .fold(base, |next, middleware| middleware(next))
    }
}

impl<Req, Res> Default for Chain<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> Clone for Chain<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<Req, Res> std::fmt::Debug for Chain<Req, Res> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// One hook per capability kind, registered together.
pub trait MiddlewareBundle: Send + Sync {
    fn tool(&self) -> ToolMiddleware;
    fn prompt(&self) -> PromptMiddleware;
    fn resource(&self) -> ResourceMiddleware;
}

/// The three per-kind chains.
#[derive(Debug, Clone, Default)]
pub struct Chains {
    pub tool: Chain<CallToolRequest, CallToolResult>,
    pub prompt: Chain<GetPromptRequest, GetPromptResult>,
    pub resource: Chain<ReadResourceRequest, ReadResourceResult>,
}

impl Chains {
    pub fn add_tool_middleware(&mut self, middleware: ToolMiddleware) {
        self.tool.push(middleware);
    }

    pub fn add_prompt_middleware(&mut self, middleware: PromptMiddleware) {
        self.prompt.push(middleware);
    }

    pub fn add_resource_middleware(&mut self, middleware: ResourceMiddleware) {
        self.resource.push(middleware);
    }

    pub fn apply_bundle(&mut self, bundle: &dyn MiddlewareBundle) {
        self.tool.push(bundle.tool());
        self.prompt.push(bundle.prompt());
        self.resource.push(bundle.resource());
    }

    pub fn wrap_tool_handler(&self, base: ToolCallHandler) -> ToolCallHandler {
        self.tool.wrap(base)
    }

    pub fn wrap_prompt_handler(&self, base: PromptGetHandler) -> PromptGetHandler {
        self.prompt.wrap(base)
    }

    pub fn wrap_resource_handler(&self, base: ResourceReadHandler) -> ResourceReadHandler {
        self.resource.wrap(base)
    }
}

/// Whether a successful exchange still reports an in-band failure.
pub trait Outcome {
    fn is_failure(&self) -> bool {
        false
    }
}

impl Outcome for CallToolResult {
    fn is_failure(&self) -> bool {
        self.is_error
    }
}

impl Outcome for GetPromptResult {}
impl Outcome for ReadResourceResult {}

/// Logs every request with its target, outcome and elapsed time.
pub fn traced<Req, Res>(kind: CapabilityKind) -> Middleware<Req, Res>
where
    Req: RequestTarget + Send + 'static,
    Res: Outcome + Send + 'static,
{
    around(move |ctx: RequestContext, req: Req, next: Handler<Req, Res>| {
        let target = req.target().to_string();
        async move {
            let started = Instant::now();
            tracing::debug!(kind = %kind, target = %target, request_id = ctx.request_id(), "dispatching");
            let result = next(ctx, req).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(res) if res.is_failure() => {
                    tracing::warn!(kind = %kind, target = %target, elapsed_ms, "completed with error result")
                }
                Ok(_) => tracing::info!(kind = %kind, target = %target, elapsed_ms, "completed"),
                Err(e) => tracing::warn!(kind = %kind, target = %target, elapsed_ms, "failed: {e}"),
            }
            result
        }
    })
}

/// Bundle applying [`traced`] to all three kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl MiddlewareBundle for TracingMiddleware {
    fn tool(&self) -> ToolMiddleware {
        traced(CapabilityKind::Tool)
    }

    fn prompt(&self) -> PromptMiddleware {
        traced(CapabilityKind::Prompt)
    }

    fn resource(&self) -> ResourceMiddleware {
        traced(CapabilityKind::Resource)
    }
}

//! Effective handlers: validation, translation, invocation and error routing.
//!
//! Each capability kind gets a base handler that runs, strictly in order:
//!
//! 1. context validation (fails fast on cancellation)
//! 2. request shape validation
//! 3. translation into the handler's argument form
//! 4. registry lookup and invocation
//! 5. translation of the result into the response shape
//!
//! The base handler is then wrapped by the kind's middleware chain. Tool
//! handler failures are reported in-band (`is_error`); prompt and resource
//! handler failures fail the exchange.

use std::sync::Arc;

use base64::Engine;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::instrument::WithSubscriber;

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult, CapabilityKind};
use crate::middleware::{
    handler_fn, Chains, Handler, PromptGetHandler, ResourceReadHandler, ToolCallHandler,
};
use crate::registry::Registry;
use crate::types::{
    CallToolRequest, CallToolResult, Content, GetPromptRequest, GetPromptResult,
    PromptArguments, PromptDescriptor, PromptMessage, ReadResourceRequest, ReadResourceResult,
    ResourceContent, ResourceDescriptor, ToolDescriptor,
};
use crate::validate::{
    validate_context, validate_prompt_request, validate_resource_request, validate_tool_request,
};

/// Frozen registry plus the three effective handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    tool: ToolCallHandler,
    prompt: PromptGetHandler,
    resource: ResourceReadHandler,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Registry,
        chains: &Chains,
        logger: Option<tracing::Dispatch>,
    ) -> Self {
        let registry = Arc::new(registry);

        let tool = chains.wrap_tool_handler(tool_base(registry.clone()));
        let prompt = chains.wrap_prompt_handler(prompt_base(registry.clone()));
        let resource = chains.wrap_resource_handler(resource_base(registry.clone()));

        match logger {
            Some(dispatch) => Self {
                registry,
                tool: under_logger(tool, dispatch.clone()),
                prompt: under_logger(prompt, dispatch.clone()),
                resource: under_logger(resource, dispatch),
            },
            None => Self {
                registry,
                tool,
                prompt,
                resource,
            },
        }
    }

    pub async fn call_tool(
        &self,
        ctx: RequestContext,
        req: CallToolRequest,
    ) -> AdapterResult<CallToolResult> {
        (self.tool)(ctx, req).await
    }

    pub async fn get_prompt(
        &self,
        ctx: RequestContext,
        req: GetPromptRequest,
    ) -> AdapterResult<GetPromptResult> {
        (self.prompt)(ctx, req).await
    }

    pub async fn read_resource(
        &self,
        ctx: RequestContext,
        req: ReadResourceRequest,
    ) -> AdapterResult<ReadResourceResult> {
        (self.resource)(ctx, req).await
    }

    /// Direct invocation path: raw bytes in, raw segments out, no middleware.
    pub async fn call_tool_direct(
        &self,
        ctx: RequestContext,
        name: &str,
        raw_args: &[u8],
    ) -> AdapterResult<Vec<String>> {
        self.registry.call_tool(ctx, name, raw_args).await
    }

    pub fn tool_handler(&self) -> ToolCallHandler {
        self.tool.clone()
    }

    pub fn prompt_handler(&self) -> PromptGetHandler {
        self.prompt.clone()
    }

    pub fn resource_handler(&self) -> ResourceReadHandler {
        self.resource.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.list_tools()
    }

    pub fn list_prompts(&self) -> Vec<PromptDescriptor> {
        self.registry.list_prompts()
    }

    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.registry.list_resources()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

fn under_logger<Req, Res>(
    handler: Handler<Req, Res>,
    dispatch: tracing::Dispatch,
) -> Handler<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, req: Req| -> BoxFuture<'static, AdapterResult<Res>> {
            Box::pin(handler(ctx, req).with_subscriber(dispatch.clone()))
        },
    )
}

fn tool_base(registry: Arc<Registry>) -> ToolCallHandler {
    handler_fn(move |ctx, req| dispatch_tool(registry.clone(), ctx, req))
}

fn prompt_base(registry: Arc<Registry>) -> PromptGetHandler {
    handler_fn(move |ctx, req| dispatch_prompt(registry.clone(), ctx, req))
}

fn resource_base(registry: Arc<Registry>) -> ResourceReadHandler {
    handler_fn(move |ctx, req| dispatch_resource(registry.clone(), ctx, req))
}

async fn dispatch_tool(
    registry: Arc<Registry>,
    ctx: RequestContext,
    req: CallToolRequest,
) -> AdapterResult<CallToolResult> {
    validate_context(Some(&ctx))?;
    let params = validate_tool_request(Some(&req))?;
    let raw = encode_tool_arguments(params.arguments.as_ref())?;
    let name = params.name.as_str();

    let handler = registry
        .tool(name)
        .map(|entry| entry.handler.clone())
        .ok_or_else(|| AdapterError::not_found(CapabilityKind::Tool, name))?;

    match handler(ctx, raw).await {
        Ok(segments) => Ok(CallToolResult::from_segments(segments)),
        Err(e) => {
            tracing::debug!(tool = name, "tool handler failed: {e:#}");
            Ok(CallToolResult::error(format!("{e:#}")))
        }
    }
}

async fn dispatch_prompt(
    registry: Arc<Registry>,
    ctx: RequestContext,
    req: GetPromptRequest,
) -> AdapterResult<GetPromptResult> {
    validate_context(Some(&ctx))?;
    let params = validate_prompt_request(Some(&req))?;
    let arguments = decode_prompt_arguments(params.arguments.clone())?;
    let name = params.name.as_str();

    let entry = registry
        .prompt(name)
        .ok_or_else(|| AdapterError::not_found(CapabilityKind::Prompt, name))?;
    let description = entry.descriptor.description.clone();
    let handler = entry.handler.clone();

    let text = handler(ctx, arguments)
        .await
        .map_err(|e| AdapterError::handler(format!("prompt '{name}'"), e))?;

    Ok(GetPromptResult {
        description: Some(description),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: Content::Text { text },
        }],
    })
}

async fn dispatch_resource(
    registry: Arc<Registry>,
    ctx: RequestContext,
    req: ReadResourceRequest,
) -> AdapterResult<ReadResourceResult> {
    validate_context(Some(&ctx))?;
    let uri = validate_resource_request(Some(&req))?.uri.clone();

    let entry = registry
        .resource(&uri)
        .ok_or_else(|| AdapterError::not_found(CapabilityKind::Resource, uri.as_str()))?;
    let declared_mime = entry.descriptor.mime_type.clone();
    let handler = entry.handler.clone();

    let body = handler(ctx, uri.clone())
        .await
        .map_err(|e| AdapterError::handler(format!("resource '{uri}'"), e))?;

    let mime_type = if body.mime_type.is_empty() {
        declared_mime
    } else {
        body.mime_type
    };
    Ok(ReadResourceResult {
        contents: vec![encode_resource_content(uri, mime_type, body.data)],
    })
}

fn encode_tool_arguments(arguments: Option<&Value>) -> AdapterResult<Vec<u8>> {
    match arguments {
        None | Some(Value::Null) => Ok(b"{}".to_vec()),
        Some(value) => serde_json::to_vec(value)
            .map_err(|e| AdapterError::request_shape(format!("tool arguments: {e}"))),
    }
}

fn decode_prompt_arguments(arguments: Option<Value>) -> AdapterResult<PromptArguments> {
    match arguments {
        None | Some(Value::Null) => Ok(PromptArguments::new()),
        Some(Value::Object(map)) => Ok(map.into_iter().collect()),
        Some(other) => Err(AdapterError::request_shape(format!(
            "prompt arguments must be an object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_textual(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    essence.starts_with("text/")
        || essence.ends_with("/json")
        || essence.ends_with("+json")
        || essence.ends_with("/xml")
        || essence.ends_with("+xml")
        || essence == "application/javascript"
}

fn encode_resource_content(uri: String, mime_type: String, data: Vec<u8>) -> ResourceContent {
    let mime = (!mime_type.is_empty()).then_some(mime_type);
    let textual = mime.as_deref().map_or(true, is_textual);

    if textual {
        match String::from_utf8(data) {
            Ok(text) => ResourceContent {
                uri,
                mime_type: mime,
                text: Some(text),
                blob: None,
            },
            Err(e) => ResourceContent {
                uri,
                mime_type: mime,
                text: None,
                blob: Some(base64::engine::general_purpose::STANDARD.encode(e.into_bytes())),
            },
        }
    } else {
        ResourceContent {
            uri,
            mime_type: mime,
            text: None,
            blob: Some(base64::engine::general_purpose::STANDARD.encode(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AdapterBuilder;
    use crate::middleware::around;
    use crate::registry::{prompt_fn, resource_fn, tool_fn};
    use crate::types::{InputSchema, ResourceBody};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counted_echo(counter: Arc<AtomicUsize>) -> crate::registry::ToolFn {
        tool_fn(move |_ctx, raw| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let args: Value = serde_json::from_slice(&raw)?;
                let message = args["message"].as_str().unwrap_or_default().to_string();
                Ok(vec![format!("Echo: {message}")])
            }
        })
    }

    #[tokio::test]
    async fn test_tool_translation_round_trip() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut builder = AdapterBuilder::new();
        builder
            .register_tool(
                "echo",
                "Echo a message",
                InputSchema::object().require("message"),
                counted_echo(counter.clone()),
            )
            .unwrap();
        let dispatcher = builder.build();

        let result = dispatcher
            .call_tool(
                RequestContext::new(),
                CallToolRequest::new("echo", Some(json!({"message": "hi"}))),
            )
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text(), "Echo: hi");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tool_error_is_in_band() {
        let mut builder = AdapterBuilder::new();
        builder
            .register_tool(
                "fail",
                "Always fails",
                InputSchema::default(),
                tool_fn(|_ctx, _raw| async { Err(anyhow::anyhow!("disk on fire")) }),
            )
            .unwrap();
        let dispatcher = builder.build();

        let result = dispatcher
            .call_tool(RequestContext::new(), CallToolRequest::new("fail", None))
            .await
            .expect("exchange must succeed");
        assert!(result.is_error);
        assert_eq!(result.text(), "disk on fire");
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut builder = AdapterBuilder::new();
        builder
            .register_tool(
                "echo",
                "Echo",
                InputSchema::default(),
                counted_echo(counter.clone()),
            )
            .unwrap();
        let dispatcher = builder.build();

        let ctx = RequestContext::new();
        ctx.cancel();
        let err = dispatcher
            .call_tool(ctx, CallToolRequest::new("echo", Some(json!({"message": "x"}))))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_params_rejected_before_lookup() {
        let dispatcher = AdapterBuilder::new().build();
        let err = dispatcher
            .call_tool(RequestContext::new(), CallToolRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::RequestShape(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_exchange() {
        let dispatcher = AdapterBuilder::new().build();
        let err = dispatcher
            .call_tool(RequestContext::new(), CallToolRequest::new("ghost", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdapterError::NotFound {
                kind: CapabilityKind::Tool,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_prompt_arguments_translated_to_map() {
        let mut builder = AdapterBuilder::new();
        builder
            .register_prompt(
                "greeting",
                "Greets someone",
                prompt_fn(|_ctx, args| async move {
                    let name = args
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("stranger")
                        .to_string();
                    Ok(format!("Hello, {name}!"))
                }),
            )
            .unwrap();
        let dispatcher = builder.build();

        let result = dispatcher
            .get_prompt(
                RequestContext::new(),
                GetPromptRequest::new("greeting", Some(json!({"name": "Ada"}))),
            )
            .await
            .unwrap();
        assert_eq!(result.description.as_deref(), Some("Greets someone"));
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, "user");
        assert_eq!(result.messages[0].content.as_text(), Some("Hello, Ada!"));

        let err = dispatcher
            .get_prompt(
                RequestContext::new(),
                GetPromptRequest::new("greeting", Some(json!(["not", "a", "map"]))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::RequestShape(_)));
    }

    #[tokio::test]
    async fn test_prompt_error_fails_exchange() {
        let mut builder = AdapterBuilder::new();
        builder
            .register_prompt(
                "broken",
                "Never renders",
                prompt_fn(|_ctx, _args| async { Err(anyhow::anyhow!("template missing")) }),
            )
            .unwrap();
        let dispatcher = builder.build();

        let err = dispatcher
            .get_prompt(RequestContext::new(), GetPromptRequest::new("broken", None))
            .await
            .unwrap_err();
        assert_eq!(err.handler_message(), Some("template missing"));
    }

    #[tokio::test]
    async fn test_resource_error_fails_exchange() {
        let mut builder = AdapterBuilder::new();
        builder
            .register_resource(
                "info://broken",
                "broken",
                "Always fails",
                "text/plain",
                resource_fn(|_ctx, _uri| async { Err(anyhow::anyhow!("backend down")) }),
            )
            .unwrap();
        let dispatcher = builder.build();

        let err = dispatcher
            .read_resource(RequestContext::new(), ReadResourceRequest::new("info://broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Handler { .. }));
        assert_eq!(err.handler_message(), Some("backend down"));
    }

    #[tokio::test]
    async fn test_resource_text_and_blob_encoding() {
        let mut builder = AdapterBuilder::new();
        builder
            .register_resource(
                "info://text",
                "text",
                "Plain text",
                "text/plain",
                resource_fn(|_ctx, uri| async move { Ok(ResourceBody::text(format!("at {uri}"))) }),
            )
            .unwrap();
        builder
            .register_resource(
                "info://bin",
                "bin",
                "Binary",
                "application/octet-stream",
                resource_fn(|_ctx, _uri| async {
                    Ok(ResourceBody::new(vec![0u8, 159, 146, 150], ""))
                }),
            )
            .unwrap();
        let dispatcher = builder.build();

        let text = dispatcher
            .read_resource(RequestContext::new(), ReadResourceRequest::new("info://text"))
            .await
            .unwrap();
        assert_eq!(text.contents[0].uri, "info://text");
        assert_eq!(text.contents[0].text.as_deref(), Some("at info://text"));
        assert_eq!(text.contents[0].mime_type.as_deref(), Some("text/plain"));

        let bin = dispatcher
            .read_resource(RequestContext::new(), ReadResourceRequest::new("info://bin"))
            .await
            .unwrap();
        assert!(bin.contents[0].text.is_none());
        assert_eq!(
            bin.contents[0].mime_type.as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(bin.contents[0].blob.as_deref(), Some("AJ+Slg=="));
    }

    #[tokio::test]
    async fn test_middleware_wraps_every_kind() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let mut builder = AdapterBuilder::new();

        let log = seen.clone();
        builder.add_tool_middleware(around(move |ctx, req: CallToolRequest, next: ToolCallHandler| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("tool".into());
                next(ctx, req).await
            }
        }));
        let log = seen.clone();
        builder.add_resource_middleware(around(
            move |ctx, req: ReadResourceRequest, next: ResourceReadHandler| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push("resource".into());
                    next(ctx, req).await
                }
            },
        ));
        let dispatcher = builder.build();

        // Rejected requests still pass through the chain.
        let _ = dispatcher
            .call_tool(RequestContext::new(), CallToolRequest::default())
            .await;
        let _ = dispatcher
            .read_resource(RequestContext::new(), ReadResourceRequest::new("info://none"))
            .await;
        assert_eq!(*seen.lock().unwrap(), vec!["tool", "resource"]);
    }

    #[tokio::test]
    async fn test_direct_path_bypasses_middleware() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::new(AtomicUsize::new(0));
        let mut builder = AdapterBuilder::new();
        builder
            .register_tool("echo", "Echo", InputSchema::default(), counted_echo(counter.clone()))
            .unwrap();
        let mw_hits = hits.clone();
        builder.add_tool_middleware(around(move |ctx, req: CallToolRequest, next: ToolCallHandler| {
            mw_hits.fetch_add(1, Ordering::SeqCst);
            async move { next(ctx, req).await }
        }));
        let dispatcher = builder.build();

        let out = dispatcher
            .call_tool_direct(RequestContext::new(), "echo", br#"{"message":"raw"}"#)
            .await
            .unwrap();
        assert_eq!(out, vec!["Echo: raw"]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_textual_mime_types() {
        assert!(is_textual("text/markdown"));
        assert!(is_textual("application/json; charset=utf-8"));
        assert!(is_textual("application/ld+json"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual("application/octet-stream"));
    }
}

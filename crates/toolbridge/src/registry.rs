//! Handler registry: name/URI keyed descriptors and their handlers.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult, CapabilityKind, HandlerError};
use crate::types::{
    InputSchema, PromptArgument, PromptArguments, PromptDescriptor, ResourceBody,
    ResourceDescriptor, ToolDescriptor, DEFAULT_SCHEMA_TYPE,
};
use crate::validate::validate_identifier;

/// Tool handler: raw JSON arguments in, text segments out.
pub type ToolFn = Arc<
    dyn Fn(RequestContext, Vec<u8>) -> BoxFuture<'static, Result<Vec<String>, HandlerError>>
        + Send
        + Sync,
>;

/// Prompt handler: argument map in, prompt text out.
pub type PromptFn = Arc<
    dyn Fn(RequestContext, PromptArguments) -> BoxFuture<'static, Result<String, HandlerError>>
        + Send
        + Sync,
>;

/// Resource handler: URI in, payload and media type out.
pub type ResourceFn = Arc<
    dyn Fn(RequestContext, String) -> BoxFuture<'static, Result<ResourceBody, HandlerError>>
        + Send
        + Sync,
>;

pub fn tool_fn<F, Fut>(f: F) -> ToolFn
where
    F: Fn(RequestContext, Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, HandlerError>> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, args: Vec<u8>| -> BoxFuture<'static, Result<Vec<String>, HandlerError>> {
            Box::pin(f(ctx, args))
        },
    )
}

pub fn prompt_fn<F, Fut>(f: F) -> PromptFn
where
    F: Fn(RequestContext, PromptArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, HandlerError>> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, args: PromptArguments| -> BoxFuture<'static, Result<String, HandlerError>> {
            Box::pin(f(ctx, args))
        },
    )
}

pub fn resource_fn<F, Fut>(f: F) -> ResourceFn
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResourceBody, HandlerError>> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, uri: String| -> BoxFuture<'static, Result<ResourceBody, HandlerError>> {
            Box::pin(f(ctx, uri))
        },
    )
}

#[derive(Clone)]
pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub handler: ToolFn,
}

#[derive(Clone)]
pub struct PromptEntry {
    pub descriptor: PromptDescriptor,
    pub handler: PromptFn,
}

#[derive(Clone)]
pub struct ResourceEntry {
    pub descriptor: ResourceDescriptor,
    pub handler: ResourceFn,
}

/// Descriptor maps for the three capability kinds.
///
/// Keys are unique; registering an existing key replaces the previous entry.
#[derive(Clone, Default)]
pub struct Registry {
    tools: HashMap<String, ToolEntry>,
    prompts: HashMap<String, PromptEntry>,
    resources: HashMap<String, ResourceEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(
        &mut self,
        name: &str,
        description: &str,
        schema: InputSchema,
        handler: impl Into<Option<ToolFn>>,
    ) -> AdapterResult<()> {
        validate_identifier("tool name", name)?;
        validate_identifier("tool description", description)?;
        let handler = handler
            .into()
            .ok_or_else(|| AdapterError::registration(format!("tool '{name}' has no handler")))?;
        let input_schema = normalize_schema(name, schema)?;

        let replaced = self
            .tools
            .insert(
                name.to_string(),
                ToolEntry {
                    descriptor: ToolDescriptor {
                        name: name.to_string(),
                        description: description.to_string(),
                        input_schema,
                    },
                    handler,
                },
            )
            .is_some();
        tracing::debug!(tool = name, replaced, "registered tool");
        Ok(())
    }

    pub fn register_prompt(
        &mut self,
        name: &str,
        description: &str,
        handler: impl Into<Option<PromptFn>>,
    ) -> AdapterResult<()> {
        self.register_prompt_with_arguments(name, description, Vec::new(), handler)
    }

    /// Like [`Registry::register_prompt`], also advertising the prompt's arguments.
    pub fn register_prompt_with_arguments(
        &mut self,
        name: &str,
        description: &str,
        arguments: Vec<PromptArgument>,
        handler: impl Into<Option<PromptFn>>,
    ) -> AdapterResult<()> {
        validate_identifier("prompt name", name)?;
        validate_identifier("prompt description", description)?;
        let handler = handler.into().ok_or_else(|| {
            AdapterError::registration(format!("prompt '{name}' has no handler"))
        })?;

        let replaced = self
            .prompts
            .insert(
                name.to_string(),
                PromptEntry {
                    descriptor: PromptDescriptor {
                        name: name.to_string(),
                        description: description.to_string(),
                        arguments,
                    },
                    handler,
                },
            )
            .is_some();
        tracing::debug!(prompt = name, replaced, "registered prompt");
        Ok(())
    }

    pub fn register_resource(
        &mut self,
        uri: &str,
        name: &str,
        description: &str,
        mime_type: &str,
        handler: impl Into<Option<ResourceFn>>,
    ) -> AdapterResult<()> {
        validate_identifier("resource URI", uri)?;
        validate_identifier("resource name", name)?;
        validate_identifier("resource description", description)?;
        let handler = handler.into().ok_or_else(|| {
            AdapterError::registration(format!("resource '{uri}' has no handler"))
        })?;

        let replaced = self
            .resources
            .insert(
                uri.to_string(),
                ResourceEntry {
                    descriptor: ResourceDescriptor {
                        uri: uri.to_string(),
                        name: name.to_string(),
                        description: description.to_string(),
                        mime_type: mime_type.to_string(),
                    },
                    handler,
                },
            )
            .is_some();
        tracing::debug!(resource = uri, replaced, "registered resource");
        Ok(())
    }

    /// Snapshot of all tool descriptors. Callers must treat it as a set.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<_> = self.tools.values().map(|e| e.descriptor.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn list_prompts(&self) -> Vec<PromptDescriptor> {
        let mut prompts: Vec<_> = self
            .prompts
            .values()
            .map(|e| e.descriptor.clone())
            .collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        let mut resources: Vec<_> = self
            .resources
            .values()
            .map(|e| e.descriptor.clone())
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    pub fn tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptEntry> {
        self.prompts.get(name)
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceEntry> {
        self.resources.get(uri)
    }

    pub fn contains_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.prompts.is_empty() && self.resources.is_empty()
    }

    /// Direct invocation: look up the raw handler and run it.
    ///
    /// Middleware and protocol translation are not involved.
    pub async fn call_tool(
        &self,
        ctx: RequestContext,
        name: &str,
        raw_args: &[u8],
    ) -> AdapterResult<Vec<String>> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| AdapterError::not_found(CapabilityKind::Tool, name))?;
        let handler = entry.handler.clone();
        handler(ctx, raw_args.to_vec())
            .await
            .map_err(|e| AdapterError::handler(format!("tool '{name}'"), e))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tools", &self.tools.len())
            .field("prompts", &self.prompts.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}

fn normalize_schema(tool: &str, mut schema: InputSchema) -> AdapterResult<InputSchema> {
    if schema.schema_type.is_empty() {
        schema.schema_type = DEFAULT_SCHEMA_TYPE.to_string();
    } else if schema.schema_type != DEFAULT_SCHEMA_TYPE {
        return Err(AdapterError::registration(format!(
            "tool '{tool}' schema type must be \"{DEFAULT_SCHEMA_TYPE}\", got \"{}\"",
            schema.schema_type
        )));
    }

    let mut seen = HashSet::new();
    for field in &schema.required {
        if !seen.insert(field.as_str()) {
            return Err(AdapterError::registration(format!(
                "tool '{tool}' lists required field '{field}' more than once"
            )));
        }
        // A schema without properties is open and not cross-checked.
        if !schema.properties.is_empty() && !schema.properties.contains_key(field) {
            return Err(AdapterError::registration(format!(
                "tool '{tool}' requires '{field}' which is not a declared property"
            )));
        }
    }

    Ok(schema)
}

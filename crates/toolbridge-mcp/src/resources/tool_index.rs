//! Resource `info://tools`: the tool listing as JSON.

use std::sync::{Arc, OnceLock};

use anyhow::Context;
use toolbridge::{
    resource_fn, AdapterBuilder, AdapterResult, RequestContext, ResourceBody, ToolDescriptor,
};

pub const URI: &str = "info://tools";

/// The listing is taken from the frozen registry, so tools registered after
/// this resource still appear.
pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    let tools: Arc<OnceLock<Vec<ToolDescriptor>>> = Arc::new(OnceLock::new());
    {
        let tools = tools.clone();
        builder.on_build(move |registry| {
            let _ = tools.set(registry.list_tools());
        });
    }
    builder.register_resource(
        URI,
        "tools",
        "Descriptors of every registered tool",
        "application/json",
        resource_fn(move |ctx, _uri| read(ctx, tools.clone())),
    )
}

async fn read(
    _ctx: RequestContext,
    tools: Arc<OnceLock<Vec<ToolDescriptor>>>,
) -> anyhow::Result<ResourceBody> {
    let tools = tools.get().context("tool index read before the adapter was built")?;
    Ok(ResourceBody::json(tools))
}

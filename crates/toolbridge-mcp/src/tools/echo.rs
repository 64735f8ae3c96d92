//! Tool `echo`: repeat a message back.

use serde::Deserialize;
use serde_json::json;
use toolbridge::{tool_fn, AdapterBuilder, AdapterResult, InputSchema, RequestContext};

pub const NAME: &str = "echo";

#[derive(Debug, Deserialize)]
struct EchoArgs {
    message: String,
}

pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    builder.register_tool(
        NAME,
        "Echo a message back to the caller",
        InputSchema::object()
            .property("message", json!({ "type": "string", "description": "Text to echo" }))
            .require("message"),
        tool_fn(execute),
    )
}

async fn execute(_ctx: RequestContext, raw: Vec<u8>) -> anyhow::Result<Vec<String>> {
    let args: EchoArgs = serde_json::from_slice(&raw)?;
    Ok(vec![format!("Echo: {}", args.message)])
}

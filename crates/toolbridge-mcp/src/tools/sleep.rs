//! Tool `sleep`: wait, giving up early when the request is cancelled.

use std::time::Duration;

use anyhow::bail;
use serde::Deserialize;
use serde_json::json;
use toolbridge::{tool_fn, AdapterBuilder, AdapterResult, InputSchema, RequestContext};

pub const NAME: &str = "sleep";

/// Upper bound on a single sleep.
pub const MAX_MILLIS: u64 = 60_000;

#[derive(Debug, Deserialize)]
struct SleepArgs {
    millis: u64,
}

pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    builder.register_tool(
        NAME,
        "Sleep for the given number of milliseconds",
        InputSchema::object()
            .property(
                "millis",
                json!({ "type": "integer", "minimum": 0, "maximum": MAX_MILLIS }),
            )
            .require("millis"),
        tool_fn(execute),
    )
}

async fn execute(ctx: RequestContext, raw: Vec<u8>) -> anyhow::Result<Vec<String>> {
    let args: SleepArgs = serde_json::from_slice(&raw)?;
    if args.millis > MAX_MILLIS {
        bail!("millis must be at most {MAX_MILLIS}");
    }
    if !ctx.sleep(Duration::from_millis(args.millis)).await {
        bail!("sleep cancelled");
    }
    Ok(vec![format!("Slept for {}ms", args.millis)])
}

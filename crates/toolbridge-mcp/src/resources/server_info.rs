//! Resource `info://server`: server name, version and uptime as JSON.

use chrono::{DateTime, Utc};
use serde_json::json;
use toolbridge::{resource_fn, AdapterBuilder, AdapterResult, RequestContext, ResourceBody};

use crate::types::{MCP_VERSION, SERVER_NAME, SERVER_VERSION};

pub const URI: &str = "info://server";

pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    let started_at = Utc::now();
    builder.register_resource(
        URI,
        "server",
        "Server name, version and uptime",
        "application/json",
        resource_fn(move |ctx, _uri| read(ctx, started_at)),
    )
}

async fn read(_ctx: RequestContext, started_at: DateTime<Utc>) -> anyhow::Result<ResourceBody> {
    let uptime = Utc::now().signed_duration_since(started_at);
    Ok(ResourceBody::json(&json!({
        "name": SERVER_NAME,
        "version": SERVER_VERSION,
        "protocolVersion": MCP_VERSION,
        "startedAt": started_at.to_rfc3339(),
        "uptimeSeconds": uptime.num_seconds(),
    })))
}

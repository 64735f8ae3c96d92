//! Newline-delimited JSON framing.

use serde_json::Value;

use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

/// Parse a single line as a JSON-RPC message.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a value to one line, trailing newline included.
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    Ok(json)
}

/// Response for input that never became a request, so carries a null id.
pub fn error_frame(err: &McpError) -> McpResult<String> {
    let value = serde_json::to_value(err.to_json_rpc_error(RequestId::Null))?;
    frame_message(&value)
}

//! JSON-RPC routing tests against the built-in capabilities.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use toolbridge::{resource_fn, tool_fn, AdapterBuilder, Dispatcher, InputSchema};
use toolbridge_mcp::builtin_builder;
use toolbridge_mcp::protocol::ProtocolHandler;
use toolbridge_mcp::types::*;

// ─────────────────────── helpers ───────────────────────

fn builtin_handler() -> Arc<ProtocolHandler> {
    let dispatcher = builtin_builder([]).unwrap().build();
    Arc::new(ProtocolHandler::new(Arc::new(dispatcher)))
}

fn handler_for(builder: AdapterBuilder) -> Arc<ProtocolHandler> {
    let dispatcher: Dispatcher = builder.build();
    Arc::new(ProtocolHandler::new(Arc::new(dispatcher)))
}

fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    mcp_request(id, "tools/call", json!({ "name": name, "arguments": arguments }))
}

async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let parsed: JsonRpcMessage = serde_json::from_value(msg).unwrap();
    handler.handle_message(parsed, &CancellationToken::new()).await
}

async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

// ─────────────────────── handshake ───────────────────────

#[tokio::test]
async fn test_initialize_advertises_registered_kinds() {
    let handler = builtin_handler();
    let resp = send_unwrap(&handler, init_request()).await;

    assert_eq!(resp["result"]["protocolVersion"], MCP_VERSION);
    assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
    assert!(resp["result"]["capabilities"]["tools"].is_object());
    assert!(resp["result"]["capabilities"]["prompts"].is_object());
    assert!(resp["result"]["capabilities"]["resources"].is_object());

    let empty = handler_for(AdapterBuilder::new());
    let resp = send_unwrap(&empty, init_request()).await;
    assert!(resp["result"]["capabilities"].get("tools").is_none());
}

#[tokio::test]
async fn test_handshake_is_recorded_in_session() {
    let handler = builtin_handler();
    assert!(handler.session().await.client_name.is_none());

    send_unwrap(&handler, init_request()).await;
    let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    assert!(send(&handler, note).await.is_none());

    let session = handler.session().await;
    assert_eq!(session.client_name.as_deref(), Some("test-client"));
    assert_eq!(session.client_version.as_deref(), Some("1.0"));
    assert!(session.initialized);
}

#[tokio::test]
async fn test_notifications_produce_no_response() {
    let handler = builtin_handler();
    let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    assert!(send(&handler, note).await.is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let handler = builtin_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "tools/frobnicate", json!({}))).await;
    assert_eq!(resp["error"]["code"], error_codes::METHOD_NOT_FOUND);
    assert_eq!(resp["id"], 1);
}

#[tokio::test]
async fn test_wrong_jsonrpc_version() {
    let handler = builtin_handler();
    let msg = json!({"jsonrpc": "1.0", "id": 4, "method": "ping"});
    let resp = send_unwrap(&handler, msg).await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_REQUEST);
}

// ─────────────────────── tools ───────────────────────

#[tokio::test]
async fn test_tools_list_is_sorted() {
    let handler = builtin_handler();
    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let names: Vec<&str> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["echo", "math", "sleep"]);
    assert_eq!(resp["result"]["tools"][0]["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn test_echo_round_trip() {
    let handler = builtin_handler();
    let resp = send_unwrap(&handler, tool_call(2, "echo", json!({"message": "hi"}))).await;
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert_eq!(resp["result"]["content"][0]["text"], "Echo: hi");
    assert!(resp["result"].get("isError").is_none());
}

#[tokio::test]
async fn test_divide_by_zero_is_flagged_result() {
    let handler = builtin_handler();
    let resp = send_unwrap(
        &handler,
        tool_call(3, "math", json!({"operation": "divide", "a": 1, "b": 0})),
    )
    .await;
    assert!(resp.get("error").is_none());
    assert_eq!(resp["result"]["isError"], true);
    assert_eq!(resp["result"]["content"][0]["text"], "division by zero");
}

#[tokio::test]
async fn test_unknown_tool_fails_exchange() {
    let handler = builtin_handler();
    let resp = send_unwrap(&handler, tool_call(4, "nope", json!({}))).await;
    assert_eq!(resp["error"]["code"], mcp_error_codes::TOOL_NOT_FOUND);
}

#[tokio::test]
async fn test_tools_call_without_params() {
    let handler = builtin_handler();
    let msg = json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call"});
    let resp = send_unwrap(&handler, msg).await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_PARAMS);
}

// ─────────────────────── prompts ───────────────────────

#[tokio::test]
async fn test_prompt_get() {
    let handler = builtin_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(
            6,
            "prompts/get",
            json!({"name": "greeting", "arguments": {"name": "Ada", "style": "formal"}}),
        ),
    )
    .await;
    let message = &resp["result"]["messages"][0];
    assert_eq!(message["role"], "user");
    assert!(message["content"]["text"]
        .as_str()
        .unwrap()
        .contains("formal greeting addressed to Ada"));
}

#[tokio::test]
async fn test_prompt_failure_fails_exchange() {
    let handler = builtin_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(7, "prompts/get", json!({"name": "greeting", "arguments": {}})),
    )
    .await;
    assert_eq!(resp["error"]["code"], mcp_error_codes::HANDLER_FAILED);
    assert!(resp.get("result").is_none());
}

#[tokio::test]
async fn test_prompt_arguments_must_be_object() {
    let handler = builtin_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(8, "prompts/get", json!({"name": "greeting", "arguments": [1, 2]})),
    )
    .await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_PARAMS);
}

// ─────────────────────── resources ───────────────────────

#[tokio::test]
async fn test_resource_read_json() {
    let handler = builtin_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(9, "resources/read", json!({"uri": "info://tools"})),
    )
    .await;
    let content = &resp["result"]["contents"][0];
    assert_eq!(content["uri"], "info://tools");
    assert_eq!(content["mimeType"], "application/json");
    let tools: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_tool_index_includes_tools_registered_later() {
    let mut builder = builtin_builder([]).unwrap();
    builder
        .register_tool(
            "zeta",
            "Registered after the built-ins",
            InputSchema::default(),
            tool_fn(|_ctx, _args| async { Ok(vec!["z".to_string()]) }),
        )
        .unwrap();
    let handler = handler_for(builder);

    let resp = send_unwrap(
        &handler,
        mcp_request(9, "resources/read", json!({"uri": "info://tools"})),
    )
    .await;
    let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
    let tools: Value = serde_json::from_str(text).unwrap();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["echo", "math", "sleep", "zeta"]);
}

#[tokio::test]
async fn test_resource_failure_fails_exchange() {
    let mut builder = AdapterBuilder::new();
    builder
        .register_resource(
            "data://broken",
            "broken",
            "Always errors",
            "text/plain",
            resource_fn(|_ctx, _uri| async { anyhow::bail!("backend offline") }),
        )
        .unwrap();
    let handler = handler_for(builder);

    let resp = send_unwrap(
        &handler,
        mcp_request(10, "resources/read", json!({"uri": "data://broken"})),
    )
    .await;
    assert_eq!(resp["error"]["code"], mcp_error_codes::HANDLER_FAILED);
    assert_eq!(
        resp["error"]["message"],
        "resource 'data://broken' failed: backend offline"
    );
}

#[tokio::test]
async fn test_unknown_resource() {
    let handler = builtin_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(11, "resources/read", json!({"uri": "info://nothing"})),
    )
    .await;
    assert_eq!(resp["error"]["code"], mcp_error_codes::RESOURCE_NOT_FOUND);
}

// ─────────────────────── cancellation ───────────────────────

#[tokio::test]
async fn test_cancel_notification_stops_in_flight_sleep() {
    let handler = builtin_handler();

    let slow = {
        let handler = handler.clone();
        tokio::spawn(async move {
            send_unwrap(&handler, tool_call(42, "sleep", json!({"millis": 30_000}))).await
        })
    };

    for _ in 0..100 {
        if handler.in_flight_count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(handler.in_flight_count().await, 1);

    let cancel = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 42, "reason": "user aborted" }
    });
    assert!(send(&handler, cancel).await.is_none());

    let resp = tokio::time::timeout(Duration::from_secs(5), slow)
        .await
        .expect("sleep should end promptly")
        .unwrap();
    assert_eq!(resp["result"]["isError"], true);
    assert_eq!(resp["result"]["content"][0]["text"], "sleep cancelled");
    assert_eq!(handler.in_flight_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_in_flight_id_is_rejected() {
    let handler = builtin_handler();

    let slow = {
        let handler = handler.clone();
        tokio::spawn(async move {
            send_unwrap(&handler, tool_call(7, "sleep", json!({"millis": 30_000}))).await
        })
    };
    for _ in 0..100 {
        if handler.in_flight_count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(handler.in_flight_count().await, 1);

    let dup = send_unwrap(&handler, tool_call(7, "echo", json!({"message": "again"}))).await;
    assert_eq!(dup["id"], 7);
    assert_eq!(dup["error"]["code"], error_codes::INVALID_REQUEST);
    assert_eq!(handler.in_flight_count().await, 1);

    // The original request is still tracked and can be cancelled.
    let cancel = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 7 }
    });
    assert!(send(&handler, cancel).await.is_none());
    let resp = tokio::time::timeout(Duration::from_secs(5), slow)
        .await
        .expect("sleep should end promptly")
        .unwrap();
    assert_eq!(resp["result"]["content"][0]["text"], "sleep cancelled");
    assert_eq!(handler.in_flight_count().await, 0);
}

#[tokio::test]
async fn test_cancelled_parent_rejects_request() {
    let handler = builtin_handler();
    let parent = CancellationToken::new();
    parent.cancel();

    let msg: JsonRpcMessage =
        serde_json::from_value(tool_call(12, "echo", json!({"message": "late"}))).unwrap();
    let resp = handler.handle_message(msg, &parent).await.unwrap();
    assert_eq!(resp["error"]["code"], mcp_error_codes::REQUEST_CANCELLED);
}

#[tokio::test]
async fn test_shutdown_trips_token() {
    let handler = builtin_handler();
    let token = handler.shutdown_token();
    assert!(!token.is_cancelled());
    let resp = send_unwrap(&handler, mcp_request(13, "shutdown", json!({}))).await;
    assert!(resp["result"].is_object());
    assert!(token.is_cancelled());
}

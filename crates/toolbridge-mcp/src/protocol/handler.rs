//! Routes JSON-RPC messages to the dispatcher's effective handlers.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use toolbridge::{
    CallToolParams, CallToolRequest, Dispatcher, GetPromptParams, GetPromptRequest,
    ReadResourceParams, ReadResourceRequest, RequestContext,
};

use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Protocol runtime over a frozen [`Dispatcher`]. Shared by every transport
/// task; each request runs under its own cancellation token.
pub struct ProtocolHandler {
    dispatcher: Arc<Dispatcher>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
    in_flight: Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
    shutdown: CancellationToken,
}

impl ProtocolHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Cancelled once a client sends `shutdown`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Client details recorded by the handshake.
    pub async fn session(&self) -> NegotiatedCapabilities {
        self.capabilities.lock().await.clone()
    }

    /// Handle one inbound message. Requests yield a response value,
    /// notifications and stray responses yield nothing.
    pub async fn handle_message(
        &self,
        msg: JsonRpcMessage,
        parent: &CancellationToken,
    ) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req, parent).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest, parent: &CancellationToken) -> Value {
        if let Err(e) = validate_request(&request) {
            return encode(e.to_json_rpc_error(request.id));
        }

        let id = request.id.clone();
        let ctx = RequestContext::child_of(id.to_string(), parent);
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(&id) {
                tracing::warn!(id = %id, "Request id already in flight");
                let err = McpError::InvalidRequest(format!("Request id {id} is already in flight"));
                return encode(err.to_json_rpc_error(id));
            }
            in_flight.insert(id.clone(), ctx.token().clone());
        }

        let result = self.dispatch_request(ctx, request).await;

        self.in_flight.lock().await.remove(&id);

        match result {
            Ok(value) => encode(JsonRpcResponse::new(id, value)),
            Err(e) => {
                tracing::debug!(id = %id, code = e.code(), "request failed: {e}");
                encode(e.to_json_rpc_error(id))
            }
        }
    }

    async fn dispatch_request(
        &self,
        ctx: RequestContext,
        request: JsonRpcRequest,
    ) -> McpResult<Value> {
        let JsonRpcRequest { method, params, .. } = request;
        match method.as_str() {
            "initialize" => self.handle_initialize(params).await,
            "shutdown" => self.handle_shutdown(),
            "ping" => Ok(Value::Object(serde_json::Map::new())),

            "tools/list" => to_value(ToolListResult {
                tools: self.dispatcher.list_tools(),
                next_cursor: None,
            }),
            "tools/call" => {
                let req = CallToolRequest {
                    params: decode_params::<CallToolParams>(params)?,
                };
                to_value(self.dispatcher.call_tool(ctx, req).await?)
            }

            "prompts/list" => to_value(PromptListResult {
                prompts: self.dispatcher.list_prompts(),
                next_cursor: None,
            }),
            "prompts/get" => {
                let req = GetPromptRequest {
                    params: decode_params::<GetPromptParams>(params)?,
                };
                to_value(self.dispatcher.get_prompt(ctx, req).await?)
            }

            "resources/list" => to_value(ResourceListResult {
                resources: self.dispatcher.list_resources(),
                next_cursor: None,
            }),
            "resources/read" => {
                let req = ReadResourceRequest {
                    params: decode_params::<ReadResourceParams>(params)?,
                };
                to_value(self.dispatcher.read_resource(ctx, req).await?)
            }

            _ => Err(McpError::MethodNotFound(method)),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                self.handle_cancelled(notification.params).await;
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_cancelled(&self, params: Option<Value>) {
        let params: CancelledParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            _ => {
                tracing::warn!("Malformed cancellation notification");
                return;
            }
        };
        let Some(id) = RequestId::from_value(&params.request_id) else {
            tracing::warn!("Cancellation names an unusable request id");
            return;
        };
        match self.in_flight.lock().await.get(&id) {
            Some(token) => {
                tracing::info!(id = %id, reason = ?params.reason, "Cancelling request");
                token.cancel();
            }
            None => tracing::debug!(id = %id, "Cancellation for unknown or finished request"),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = decode_params(params)?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let registry = self.dispatcher.registry();
        let capabilities = ServerCapabilities::for_counts(
            registry.tool_count(),
            registry.prompt_count(),
            registry.resource_count(),
        );
        let result = self
            .capabilities
            .lock()
            .await
            .negotiate(init_params, capabilities);
        to_value(result)
    }

    fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!("Shutdown requested");
        self.shutdown.cancel();
        Ok(Value::Object(serde_json::Map::new()))
    }
}

/// Absent params stay absent so the adapter can report the missing shape.
fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<Option<T>> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn to_value(value: impl Serialize) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

fn encode(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

//! Runtime errors and their JSON-RPC codes.

use toolbridge::{AdapterError, CapabilityKind, Lifecycle};

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const REQUEST_CANCELLED: i32 = -32800;
    pub const RESOURCE_NOT_FOUND: i32 = -32802;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const PROMPT_NOT_FOUND: i32 = -32804;
    pub const HANDLER_FAILED: i32 = -32805;

    /// Missing or invalid bearer token.
    pub const UNAUTHORIZED: i32 = -32900;
}

#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Request cancelled")]
    RequestCancelled,

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("{0}")]
    HandlerFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport already running: {0}")]
    AlreadyRunning(&'static str),

    #[error("Server is {0}")]
    InvalidState(Lifecycle),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthorized,
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_)
            | McpError::Transport(_)
            | McpError::AlreadyRunning(_)
            | McpError::InvalidState(_)
            | McpError::Io(_) => INTERNAL_ERROR,
            McpError::RequestCancelled => REQUEST_CANCELLED,
            McpError::ResourceNotFound(_) => RESOURCE_NOT_FOUND,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::PromptNotFound(_) => PROMPT_NOT_FOUND,
            McpError::HandlerFailed(_) => HANDLER_FAILED,
            McpError::Unauthorized => UNAUTHORIZED,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: None,
            },
        }
    }
}

impl From<AdapterError> for McpError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::Registration(msg) => McpError::InternalError(msg),
            AdapterError::Context(_) => McpError::RequestCancelled,
            AdapterError::RequestShape(msg) => McpError::InvalidParams(msg),
            err @ AdapterError::Handler { .. } => McpError::HandlerFailed(err.to_string()),
            AdapterError::NotFound { kind, key } => match kind {
                CapabilityKind::Tool => McpError::ToolNotFound(key),
                CapabilityKind::Prompt => McpError::PromptNotFound(key),
                CapabilityKind::Resource => McpError::ResourceNotFound(key),
            },
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

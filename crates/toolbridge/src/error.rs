//! Error taxonomy for registration, validation and dispatch.

use std::fmt;

/// The three categories of invocable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Tool,
    Prompt,
    Resource,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Tool => "tool",
            CapabilityKind::Prompt => "prompt",
            CapabilityKind::Resource => "resource",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request context was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFailure {
    Missing,
    Cancelled,
}

impl fmt::Display for ContextFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextFailure::Missing => f.write_str("request context is missing"),
            ContextFailure::Cancelled => f.write_str("request cancelled"),
        }
    }
}

/// Errors raised by the adapter.
///
/// Application handlers fail with [`HandlerError`]; the dispatcher wraps those
/// into [`AdapterError::Handler`] together with the operation that failed.
#[derive(thiserror::Error, Debug)]
pub enum AdapterError {
    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Context error: {0}")]
    Context(ContextFailure),

    #[error("Invalid request: {0}")]
    RequestShape(String),

    #[error("{operation} failed: {message}")]
    Handler { operation: String, message: String },

    #[error("{kind} not found: {key}")]
    NotFound { kind: CapabilityKind, key: String },
}

/// Error type returned by application-supplied handlers.
pub type HandlerError = anyhow::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    pub fn registration(message: impl Into<String>) -> Self {
        AdapterError::Registration(message.into())
    }

    pub fn request_shape(message: impl Into<String>) -> Self {
        AdapterError::RequestShape(message.into())
    }

    pub fn not_found(kind: CapabilityKind, key: impl Into<String>) -> Self {
        AdapterError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Wrap an application handler error with the operation it belongs to.
    pub fn handler(operation: impl Into<String>, err: HandlerError) -> Self {
        AdapterError::Handler {
            operation: operation.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AdapterError::Context(ContextFailure::Cancelled))
    }

    /// The plain handler message, without the operation prefix.
    pub fn handler_message(&self) -> Option<&str> {
        match self {
            AdapterError::Handler { message, .. } => Some(message),
            _ => None,
        }
    }
}

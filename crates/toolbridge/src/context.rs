//! Per-request context carrying the cancellation signal.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Context handed to every handler invocation.
///
/// Cloning shares the cancellation signal. Cancelling one request's context
/// never touches another request or the serving loop.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    token: CancellationToken,
}

impl RequestContext {
    /// A fresh context with a generated request id.
    pub fn new() -> Self {
        Self::with_token(uuid::Uuid::new_v4().to_string(), CancellationToken::new())
    }

    pub fn with_token(request_id: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            request_id: request_id.into(),
            token,
        }
    }

    /// A context whose signal is cancelled when `parent` is.
    pub fn child_of(request_id: impl Into<String>, parent: &CancellationToken) -> Self {
        Self::with_token(request_id, parent.child_token())
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check of the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Wait for `duration` unless the request is cancelled first.
    ///
    /// Returns `true` when the full delay elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.token.cancelled() => false,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

//! Serving entry point: binds a frozen dispatcher to one transport run.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use toolbridge::{AdapterBuilder, Dispatcher, Lifecycle};

use crate::protocol::ProtocolHandler;
use crate::transport::Transport;
use crate::types::{McpError, McpResult};

pub struct McpServer {
    handler: Arc<ProtocolHandler>,
    state: Mutex<Lifecycle>,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            handler: Arc::new(ProtocolHandler::new(Arc::new(dispatcher))),
            state: Mutex::new(Lifecycle::Registering),
        }
    }

    /// Freeze the builder and wrap the result.
    pub fn from_builder(builder: AdapterBuilder) -> Self {
        Self::new(builder.build())
    }

    /// Handler to construct transports with.
    pub fn handler(&self) -> Arc<ProtocolHandler> {
        self.handler.clone()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.handler.dispatcher().clone()
    }

    pub fn state(&self) -> Lifecycle {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(Lifecycle::Terminated)
    }

    /// Run `transport` until it stops. A server serves once: a second call,
    /// concurrent or after termination, is rejected, as is a context that is
    /// already cancelled.
    pub async fn serve(&self, transport: &dyn Transport, ctx: CancellationToken) -> McpResult<()> {
        if ctx.is_cancelled() {
            return Err(McpError::RequestCancelled);
        }
        self.transition(Lifecycle::Running)?;

        tracing::info!(transport = transport.transport_type(), "Serving");
        let result = transport.start(ctx).await;

        if let Ok(mut state) = self.state.lock() {
            *state = Lifecycle::Terminated;
        }
        match &result {
            Ok(()) => tracing::info!(transport = transport.transport_type(), "Transport finished"),
            Err(e) => tracing::error!(transport = transport.transport_type(), "Transport failed: {e}"),
        }
        result
    }

    fn transition(&self, next: Lifecycle) -> McpResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| McpError::InternalError(e.to_string()))?;
        match *state {
            Lifecycle::Created | Lifecycle::Registering => {
                *state = next;
                Ok(())
            }
            current => Err(McpError::InvalidState(current)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Immediate;

    #[async_trait]
    impl Transport for Immediate {
        async fn start(&self, _ctx: CancellationToken) -> McpResult<()> {
            Ok(())
        }

        async fn stop(&self, _ctx: CancellationToken) -> McpResult<()> {
            Ok(())
        }

        fn transport_type(&self) -> &'static str {
            "immediate"
        }
    }

    #[tokio::test]
    async fn test_serve_runs_once() {
        let server = McpServer::from_builder(AdapterBuilder::new());
        assert_eq!(server.state(), Lifecycle::Registering);

        server.serve(&Immediate, CancellationToken::new()).await.unwrap();
        assert_eq!(server.state(), Lifecycle::Terminated);

        let err = server
            .serve(&Immediate, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidState(Lifecycle::Terminated)));
    }

    #[tokio::test]
    async fn test_cancelled_context_is_rejected() {
        let server = McpServer::from_builder(AdapterBuilder::new());
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = server.serve(&Immediate, ctx).await.unwrap_err();
        assert!(matches!(err, McpError::RequestCancelled));
        assert_eq!(server.state(), Lifecycle::Registering);
    }
}

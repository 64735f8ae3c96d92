//! Transport contract and its implementations.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::McpResult;

mod control;
pub mod framing;
#[cfg(feature = "http")]
pub mod http;
pub mod stdio;

#[cfg(feature = "http")]
pub use http::{ConnectionStats, HttpTransport};
pub use stdio::StdioTransport;

/// Delivery mechanism for protocol messages.
///
/// `start` runs the receive loop and returns once `ctx` is cancelled, the
/// peer goes away, or [`Transport::stop`] is called.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn start(&self, ctx: CancellationToken) -> McpResult<()>;

    /// Stop accepting work and wait for the running `start` to return.
    /// In-flight requests may finish until `ctx` is cancelled, after which
    /// they are cancelled too.
    async fn stop(&self, ctx: CancellationToken) -> McpResult<()>;

    fn transport_type(&self) -> &'static str;
}

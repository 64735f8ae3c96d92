//! Toolbridge MCP runtime: serve a toolbridge dispatcher over JSON-RPC.

pub mod config;
pub mod prompts;
pub mod protocol;
pub mod repl;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

use toolbridge::{AdapterBuilder, AdapterOption, AdapterResult};

pub use protocol::ProtocolHandler;
pub use server::McpServer;
pub use transport::Transport;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::StdioTransport;

/// Builder preloaded with the built-in tools, prompts and resources.
pub fn builtin_builder(
    options: impl IntoIterator<Item = AdapterOption>,
) -> AdapterResult<AdapterBuilder> {
    let mut builder = AdapterBuilder::new().with_options(options);
    tools::register_all(&mut builder)?;
    prompts::register_all(&mut builder)?;
    resources::register_all(&mut builder)?;
    Ok(builder)
}

//! Capability negotiation during `initialize`.

use serde::Serialize;

use crate::types::{InitializeParams, InitializeResult, ServerCapabilities, MCP_VERSION};

/// What the handshake has established about the client so far.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiatedCapabilities {
    pub client_name: Option<String>,
    pub client_version: Option<String>,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    pub fn negotiate(
        &mut self,
        params: InitializeParams,
        server: ServerCapabilities,
    ) -> InitializeResult {
        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                params.protocol_version,
                MCP_VERSION
            );
        }

        self.client_name = Some(params.client_info.name.clone());
        self.client_version = Some(params.client_info.version.clone());

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        InitializeResult::new(MCP_VERSION.to_string(), server)
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        tracing::info!("MCP handshake complete");
    }
}

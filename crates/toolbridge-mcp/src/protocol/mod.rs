//! JSON-RPC routing onto the adapter.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::ProtocolHandler;

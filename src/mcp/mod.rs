//! MCP over JSON-RPC: envelopes, error codes and method dispatch.

pub mod rpc;
pub mod server;

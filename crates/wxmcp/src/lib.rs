//! # wxmcp
//!
//! A small Model Context Protocol server runtime for exposing typed tools to a
//! language-model host.
//!
//! ## Overview
//!
//! Tools are registered once at startup into a [`ToolSet`]. Each tool declares
//! a [`ParameterSchema`]; the registry checks incoming arguments against it,
//! deserializes them into the tool's typed parameters and runs the handler.
//! Every failure, including a panicking handler, is folded into a structured
//! [`ToolError`] that the host receives as an ordinary tool result.
//!
//! [`ToolServer`] serves a `ToolSet` through [`Server`], which speaks
//! newline-delimited JSON-RPC over stdio or any async byte stream. Calls run
//! concurrently and can be cancelled individually by the host.
//!
//! ```ignore
//! let mut tools = ToolSet::new();
//! tools.register_handler(MyTool::default())?;
//! let handler = ToolServer::new("my-server", "1.0.0", Arc::new(tools));
//! Server::new(move || handler.clone()).serve_stdio().await?;
//! ```

/// Argument envelope used by tool calls.
mod arguments;
/// JSON-RPC codec for stream framing.
mod codec;
/// Connection trait for servers.
mod connection;
/// Server context type.
mod context;
/// Error types and Result aliases.
mod error;
/// JSON-RPC message construction helpers.
mod jsonrpc;
/// Declarative tool parameter schemas.
mod params;
/// Server implementation and handle type.
mod server;
/// `ServerHandler` backed by a `ToolSet`.
mod tool_server;
/// Tool registry and dispatch.
mod toolset;
/// Transport traits and adapters.
mod transport;

/// Public schema types for MCP messages.
pub mod schema;
pub mod testutils;

pub use arguments::Arguments;
pub use codec::{Incoming, JsonRpcCodec};
pub use connection::ServerHandler;
pub use context::ServerCtx;
pub use error::{Error, Result, ToolError, ToolErrorKind, ToolResult, ValidationReason};
pub use params::{ParamSpec, ParamType, ParameterSchema};
pub use server::{Server, ServerHandle};
pub use tool_server::ToolServer;
pub use toolset::{ToolDefinition, ToolFuture, ToolHandler, ToolSet};
pub use transport::{GenericDuplex, StdioTransport, StreamTransport, Transport, TransportStream};

#[cfg(test)]
mod tests {
    use super::schema::*;

    #[test]
    fn test_jsonrpc_request_serialization() {
        let request = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(1),
            request: Request {
                method: "tools/list".to_string(),
                params: None,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        let parsed: JSONRPCRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.jsonrpc, JSONRPC_VERSION);
        assert_eq!(parsed.id, RequestId::Number(1));
        assert_eq!(parsed.request.method, "tools/list");
    }

    #[test]
    fn test_text_result_wire_shape() {
        let result = CallToolResult::new().with_text_content("{\"temp\":20}");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"content": [{"type": "text", "text": "{\"temp\":20}"}]})
        );
    }
}

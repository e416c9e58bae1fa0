//! Model Context Protocol wire types.
//!
//! Only the slice of the protocol a tool server needs is modelled here:
//! lifecycle, tool listing and invocation, cancellation and logging.
//!
//! For detailed semantics of each type, refer to the
//! [MCP specification](https://spec.modelcontextprotocol.io/).
#![allow(missing_docs)]

/// JSON-RPC 2.0 message types and constants for the MCP protocol.
mod jsonrpc;
/// Request and notification types for client-server communication.
mod requests;

/// Content payload types.
mod content;
/// Implementation metadata.
mod implementation;
/// Initialization and capability types.
mod initialization;
/// Logging types.
mod logging;
/// Tool schema types.
mod tools;

pub use content::*;
pub use implementation::*;
pub use initialization::*;
pub use jsonrpc::*;
pub use logging::*;
pub use requests::*;
pub use tools::*;

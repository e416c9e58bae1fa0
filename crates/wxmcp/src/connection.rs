use async_trait::async_trait;

use crate::{
    Error, Result,
    context::ServerCtx,
    schema::{self, Cursor, InitializeResult, ListToolsResult, LoggingLevel},
};

/// Handler trait for implementing MCP servers.
///
/// This trait defines how a server responds to client requests. Each client
/// connection gets its own handler instance, created by the factory function
/// passed to [`crate::Server::new`].
///
/// **Listing methods** return empty results by default, so a minimal handler
/// advertises nothing until overridden. **Dispatch methods** return errors by
/// default: [`call_tool`](Self::call_tool) answers `Error::ToolNotFound`.
/// **Lifecycle methods** are no-ops.
///
/// All methods take `&self` so that requests from the same client can be
/// handled concurrently. For most servers [`crate::ToolServer`] is the only
/// implementation needed.
#[async_trait]
pub trait ServerHandler: Send + Sync {
    /// Called after the client has completed the initialize handshake.
    ///
    /// # Arguments
    /// * `context` - The server context
    /// * `remote_addr` - The remote address ("stdio" for stdio connections)
    async fn on_connect(&self, _context: &ServerCtx, _remote_addr: &str) -> Result<()> {
        Ok(())
    }

    /// Called when the server is shutting down
    async fn on_shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Handle initialize request
    async fn initialize(
        &self,
        _context: &ServerCtx,
        _protocol_version: String,
        _capabilities: schema::ClientCapabilities,
        _client_info: schema::Implementation,
    ) -> Result<InitializeResult>;

    /// Respond to a ping request from the client
    async fn pong(&self, _context: &ServerCtx) -> Result<()> {
        Ok(())
    }

    /// List available tools
    async fn list_tools(
        &self,
        _context: &ServerCtx,
        _cursor: Option<Cursor>,
    ) -> Result<ListToolsResult> {
        Ok(ListToolsResult::default())
    }

    /// Call a tool
    async fn call_tool(
        &self,
        _context: &ServerCtx,
        name: String,
        _arguments: Option<crate::Arguments>,
    ) -> Result<schema::CallToolResult> {
        Err(Error::ToolNotFound(name))
    }

    /// Set logging level
    ///
    /// The default stores the level on the connection so that
    /// [`ServerCtx::log`] filters accordingly.
    async fn set_level(&self, context: &ServerCtx, level: LoggingLevel) -> Result<()> {
        context.set_log_level(level);
        Ok(())
    }

    /// Handle a notification sent from the client
    ///
    /// Cancellation is handled by the server loop before this is called; the
    /// default implementation ignores everything.
    async fn notification(
        &self,
        _context: &ServerCtx,
        _notification: schema::ClientNotification,
    ) -> Result<()> {
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    Arguments, Result, ServerCtx, ServerHandler, ToolSet,
    schema::{
        CallToolResult, ClientCapabilities, Cursor, Implementation, InitializeResult,
        LATEST_PROTOCOL_VERSION, ListToolsResult, PREVIOUS_PROTOCOL_VERSION,
    },
};

/// A [`ServerHandler`] that serves a fixed [`ToolSet`].
///
/// Cloning is cheap; every connection shares the same read-only registry.
#[derive(Clone)]
pub struct ToolServer {
    name: String,
    version: String,
    instructions: Option<String>,
    tools: Arc<ToolSet>,
}

impl ToolServer {
    /// Serve `tools` under the given server name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: Arc<ToolSet>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
            tools,
        }
    }

    /// Instructions returned to the host on initialize.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

#[async_trait]
impl ServerHandler for ToolServer {
    async fn initialize(
        &self,
        _context: &ServerCtx,
        protocol_version: String,
        _capabilities: ClientCapabilities,
        client_info: Implementation,
    ) -> Result<InitializeResult> {
        info!(
            "Client {} {} connected (protocol {})",
            client_info.name, client_info.version, protocol_version
        );
        // Echo a version we speak, otherwise offer the newest.
        let negotiated = if protocol_version == PREVIOUS_PROTOCOL_VERSION {
            PREVIOUS_PROTOCOL_VERSION
        } else {
            LATEST_PROTOCOL_VERSION
        };
        let mut result = InitializeResult::new(self.name.clone())
            .with_version(self.version.clone())
            .with_mcp_version(negotiated)
            .with_tools(false)
            .with_logging();
        if let Some(instructions) = &self.instructions {
            result = result.with_instructions(instructions.clone());
        }
        Ok(result)
    }

    async fn list_tools(
        &self,
        _context: &ServerCtx,
        _cursor: Option<Cursor>,
    ) -> Result<ListToolsResult> {
        Ok(ListToolsResult::new().with_tools(self.tools.list_tools()))
    }

    async fn call_tool(
        &self,
        context: &ServerCtx,
        name: String,
        arguments: Option<Arguments>,
    ) -> Result<CallToolResult> {
        self.tools.call_tool(context, &name, arguments).await
    }
}

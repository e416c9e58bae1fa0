#![allow(missing_docs)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::*;
use crate::Arguments;

// Messages sent from the client to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
/// Requests issued by the client.
pub enum ClientRequest {
    #[serde(rename = "ping")]
    /// Ping the server.
    Ping {
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<RequestMeta>,
    },
    #[serde(rename = "initialize")]
    /// Initialize a new session with the server.
    Initialize {
        /// The latest version of the Model Context Protocol that the client
        /// supports. The client MAY decide to support older versions as well.
        #[serde(rename = "protocolVersion")]
        protocol_version: String,
        /// Client capabilities advertised to the server.
        #[serde(default)]
        capabilities: Box<ClientCapabilities>,
        #[serde(rename = "clientInfo")]
        /// Client implementation information.
        client_info: Implementation,
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<RequestMeta>,
    },
    #[serde(rename = "logging/setLevel")]
    /// Set the server logging level.
    SetLevel {
        /// The level of logging that the client wants to receive from the
        /// server.
        level: LoggingLevel,
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<RequestMeta>,
    },
    #[serde(rename = "tools/call")]
    /// Invoke a tool by name.
    CallTool {
        /// Name of the tool to invoke.
        name: String,
        /// Untyped arguments for the tool.
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<Arguments>,
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<RequestMeta>,
    },
    #[serde(rename = "tools/list")]
    /// List available tools.
    ListTools {
        /// An opaque token representing the current pagination position.
        #[serde(skip_serializing_if = "Option::is_none")]
        cursor: Option<Cursor>,
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<RequestMeta>,
    },
}

impl ClientRequest {
    /// Create a new Ping request
    pub fn ping() -> Self {
        Self::Ping { _meta: None }
    }

    /// Create a new Initialize request
    pub fn initialize(
        protocol_version: impl Into<String>,
        capabilities: ClientCapabilities,
        client_info: Implementation,
    ) -> Self {
        Self::Initialize {
            protocol_version: protocol_version.into(),
            capabilities: Box::new(capabilities),
            client_info,
            _meta: None,
        }
    }

    /// Create a new SetLevel request
    pub fn set_level(level: LoggingLevel) -> Self {
        Self::SetLevel { level, _meta: None }
    }

    /// Create a new CallTool request
    pub fn call_tool(name: impl Into<String>, arguments: Option<Arguments>) -> Self {
        Self::CallTool {
            name: name.into(),
            arguments,
            _meta: None,
        }
    }

    /// Create a new ListTools request
    pub fn list_tools(cursor: Option<Cursor>) -> Self {
        Self::ListTools {
            cursor,
            _meta: None,
        }
    }

    /// Get the method name for this request
    pub fn method(&self) -> &'static str {
        match self {
            Self::Ping { .. } => "ping",
            Self::Initialize { .. } => "initialize",
            Self::SetLevel { .. } => "logging/setLevel",
            Self::CallTool { .. } => "tools/call",
            Self::ListTools { .. } => "tools/list",
        }
    }
}

/// Notifications sent from the client to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ClientNotification {
    /// Sent by the client to indicate that it is cancelling a previously-issued
    /// request. The result of that request will be unused, so any associated
    /// processing SHOULD cease.
    ///
    /// A client MUST NOT attempt to cancel its `initialize` request.
    #[serde(rename = "notifications/cancelled")]
    Cancelled {
        /// The ID of the request to cancel.
        #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        /// An optional string describing the reason for the cancellation.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<HashMap<String, Value>>,
    },

    /// Sent from the client to the server after initialization has finished.
    #[serde(rename = "notifications/initialized")]
    Initialized {
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<HashMap<String, Value>>,
    },
}

impl ClientNotification {
    /// Create a cancellation notification for a request.
    pub fn cancelled(request_id: Option<RequestId>, reason: Option<String>) -> Self {
        Self::Cancelled {
            request_id,
            reason,
            _meta: None,
        }
    }

    /// Create an initialized notification.
    pub fn initialized() -> Self {
        Self::Initialized { _meta: None }
    }
}

/// Notifications sent from the server to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ServerNotification {
    /// Log message notification from the server to the client.
    #[serde(rename = "notifications/message")]
    LoggingMessage {
        /// The severity of this log message.
        level: LoggingLevel,
        /// An optional name of the logger issuing this message.
        #[serde(skip_serializing_if = "Option::is_none")]
        logger: Option<String>,
        /// The data to be logged, such as a string message or an object.
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        _meta: Option<HashMap<String, Value>>,
    },
}

impl ServerNotification {
    /// Create a logging message notification.
    pub fn logging_message(level: LoggingLevel, logger: Option<String>, data: Value) -> Self {
        Self::LoggingMessage {
            level,
            logger,
            data,
            _meta: None,
        }
    }

    /// JSON-RPC method name for this notification.
    pub fn method(&self) -> &'static str {
        match self {
            Self::LoggingMessage { .. } => "notifications/message",
        }
    }
}

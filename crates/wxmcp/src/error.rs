use std::{fmt, io, result::Result as StdResult};

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::schema::{
    CallToolResult, ErrorObject, INVALID_PARAMS, JSONRPC_VERSION,
    JSONRPCErrorResponse, METHOD_NOT_FOUND, PARSE_ERROR, RequestId,
};

#[derive(Error, Debug, Clone)]
/// Error type for protocol and runtime operations.
pub enum Error {
    /// I/O error with a message.
    #[error("IO error: {message}")]
    Io {
        /// Error message details.
        message: String,
    },

    /// JSON serialization or parsing error.
    #[error("JSON serialization error: {message}")]
    JsonParse {
        /// Error message details.
        message: String,
    },

    /// Transport-layer error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Method not found error.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters error.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// A tool with this name is already registered.
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Tool not found error.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid configuration error.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation timed out.
    #[error("Timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },
}

impl Error {
    /// Convert error to a specific JSONRPC response if applicable
    pub(crate) fn to_jsonrpc_response(&self, request_id: RequestId) -> Option<JSONRPCErrorResponse> {
        let (code, message, data) = match self {
            Self::ToolNotFound(tool_name) => (
                INVALID_PARAMS,
                format!("Unknown tool: {tool_name}"),
                Some(json!({ "errorKind": ToolErrorKind::UnknownTool.as_str() })),
            ),
            Self::MethodNotFound(method_name) => (
                METHOD_NOT_FOUND,
                format!("Method not found: {method_name}"),
                None,
            ),
            Self::InvalidParams(message) => (
                INVALID_PARAMS,
                format!("Invalid parameters: {message}"),
                None,
            ),
            Self::JsonParse { message } => (
                PARSE_ERROR,
                format!("JSON serialization error: {message}"),
                None,
            ),
            // Everything else is reported as INTERNAL_ERROR by the caller
            _ => return None,
        };

        Some(JSONRPCErrorResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(request_id),
            error: ErrorObject {
                code,
                message,
                data,
            },
        })
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
        }
    }
}

/// Result alias using the crate error type.
pub type Result<T> = StdResult<T, Error>;

/// Why a single argument failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// A required parameter was not supplied.
    Missing,
    /// The supplied value has the wrong primitive type.
    TypeMismatch {
        /// Type declared by the tool's parameter schema.
        expected: String,
        /// Type of the value actually supplied.
        actual: String,
    },
    /// The value has the right type but is unusable.
    Invalid(String),
}

impl ValidationReason {
    /// Short machine-readable reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::TypeMismatch { .. } => "type mismatch",
            Self::Invalid(_) => "invalid",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch (expected {expected}, got {actual})")
            }
            Self::Invalid(detail) => write!(f, "invalid ({detail})"),
        }
    }
}

/// Failure category reported back to the caller of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// No tool is registered under the requested name.
    UnknownTool,
    /// Arguments did not satisfy the tool's parameter schema.
    Validation {
        /// Offending parameter name.
        parameter: String,
        /// What was wrong with it.
        reason: ValidationReason,
    },
    /// An upstream service could not be reached.
    UpstreamUnreachable,
    /// An upstream service answered with a non-success status.
    UpstreamError {
        /// HTTP status code returned by the upstream.
        status: u16,
    },
    /// An upstream response body could not be interpreted.
    MalformedResponse,
    /// The requested entity does not exist upstream.
    NotFound,
    /// An outbound request exceeded its deadline.
    Timeout,
    /// The call was cancelled by the host.
    Cancelled,
    /// The handler failed unexpectedly.
    Internal,
}

impl ToolErrorKind {
    /// Wire name of this kind, used as `errorKind` in failure payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown-tool",
            Self::Validation { .. } => "validation",
            Self::UpstreamUnreachable => "upstream-unreachable",
            Self::UpstreamError { .. } => "upstream-error",
            Self::MalformedResponse => "malformed-response",
            Self::NotFound => "not-found",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool invocation.
///
/// Tool failures are values, not faults: the registry turns every one of them
/// into a result the host can read, and none of them tear down the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ToolError {
    /// Failure category.
    pub kind: ToolErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ToolError {
    /// Create a tool error of the given kind.
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// No tool registered under `name`.
    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ToolErrorKind::UnknownTool, format!("Unknown tool: {name}"))
    }

    /// Argument validation failure for `parameter`.
    pub fn validation(parameter: impl Into<String>, reason: ValidationReason) -> Self {
        let parameter = parameter.into();
        let message = format!("Invalid argument '{parameter}': {reason}");
        Self::new(ToolErrorKind::Validation { parameter, reason }, message)
    }

    /// Upstream could not be reached.
    pub fn upstream_unreachable(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UpstreamUnreachable, message)
    }

    /// Upstream answered with a non-success status.
    pub fn upstream_error(status: u16, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UpstreamError { status }, message)
    }

    /// Upstream body could not be interpreted.
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::MalformedResponse, message)
    }

    /// Requested entity does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    /// Outbound request deadline expired.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message)
    }

    /// Call was cancelled.
    pub fn cancelled() -> Self {
        Self::new(ToolErrorKind::Cancelled, "Call cancelled")
    }

    /// Unexpected handler failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message)
    }

    /// Structured failure payload: `{errorKind, message, ...details}`.
    pub fn to_structured(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("errorKind".into(), Value::from(self.kind.as_str()));
        payload.insert("message".into(), Value::from(self.message.clone()));
        match &self.kind {
            ToolErrorKind::Validation { parameter, reason } => {
                payload.insert("parameter".into(), Value::from(parameter.clone()));
                payload.insert("reason".into(), Value::from(reason.as_str()));
                if let ValidationReason::TypeMismatch { expected, actual } = reason {
                    payload.insert("expected".into(), Value::from(expected.clone()));
                    payload.insert("actual".into(), Value::from(actual.clone()));
                }
            }
            ToolErrorKind::UpstreamError { status } => {
                payload.insert("status".into(), Value::from(*status));
            }
            _ => {}
        }
        Value::Object(payload)
    }
}

impl From<ToolError> for CallToolResult {
    fn from(error: ToolError) -> Self {
        CallToolResult::new()
            .with_text_content(error.message.clone())
            .with_structured_content(error.to_structured())
            .mark_as_error()
    }
}

/// Result alias for tool handlers.
pub type ToolResult<T = CallToolResult> = StdResult<T, ToolError>;

use std::{
    any::Any,
    collections::HashMap,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Instant,
};

use async_trait::async_trait;
use futures::{FutureExt, future::BoxFuture};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    Arguments, Error, Result, ServerCtx,
    error::{ToolError, ToolErrorKind, ToolResult, ValidationReason},
    params::ParameterSchema,
    schema::{CallToolResult, Tool, ToolAnnotations},
};

/// Shared boxed future type used by tool dispatch.
pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// Type-erased handler stored in the registry.
type DynHandler =
    Arc<dyn for<'a> Fn(&'a ServerCtx, Arguments) -> ToolFuture<'a, ToolResult> + Send + Sync>;

/// Name, description and parameters of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description shown to the host.
    pub description: String,
    /// Declared parameters, checked before the handler runs.
    pub parameters: ParameterSchema,
    /// Behaviour hints for the host.
    pub annotations: Option<ToolAnnotations>,
}

impl ToolDefinition {
    /// Create a definition with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::new(),
            annotations: None,
        }
    }

    /// Set the parameter schema.
    pub fn with_parameters(mut self, parameters: ParameterSchema) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the behaviour hints.
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Wire form advertised in `tools/list`.
    pub fn to_tool(&self) -> Tool {
        let tool = Tool::new(self.name.clone(), self.parameters.to_tool_schema())
            .with_description(self.description.clone());
        match &self.annotations {
            Some(annotations) => tool.with_annotations(annotations.clone()),
            None => tool,
        }
    }
}

/// A tool with typed parameters.
///
/// The registry validates incoming arguments against
/// [`definition`](Self::definition) and deserializes them into
/// [`Params`](Self::Params) before calling [`call`](Self::call).
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    /// Typed parameters for one call.
    type Params: DeserializeOwned + Send;

    /// Tool name, description and parameter schema.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool.
    async fn call(&self, ctx: &ServerCtx, params: Self::Params) -> ToolResult;
}

/// A registered tool.
#[derive(Clone)]
struct ToolEntry {
    definition: ToolDefinition,
    handler: DynHandler,
}

/// Registry of invocable tools.
///
/// Tools are registered once at startup through `&mut self`; the finished set
/// is then shared read-only, usually as `Arc<ToolSet>`, so concurrent calls
/// never contend on it.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: HashMap<String, ToolEntry>,
}

impl ToolSet {
    /// Create an empty tool set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool from a definition and an untyped handler function.
    ///
    /// The handler receives arguments that already passed validation.
    pub fn register<F>(&mut self, definition: ToolDefinition, handler: F) -> Result<()>
    where
        F: for<'a> Fn(&'a ServerCtx, Arguments) -> ToolFuture<'a, ToolResult>
            + Send
            + Sync
            + 'static,
    {
        if definition.name.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "tool name must not be empty".to_string(),
            ));
        }
        if self.tools.contains_key(&definition.name) {
            return Err(Error::DuplicateTool(definition.name));
        }
        debug!("Registered tool {}", definition.name);
        self.tools.insert(
            definition.name.clone(),
            ToolEntry {
                definition,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Register a typed [`ToolHandler`].
    pub fn register_handler<H: ToolHandler>(&mut self, handler: H) -> Result<()> {
        let definition = handler.definition();
        let handler = Arc::new(handler);
        self.register(definition, move |ctx: &ServerCtx, arguments: Arguments| {
            let handler = Arc::clone(&handler);
            let ctx = ctx.clone();
            Box::pin(async move {
                let params = arguments.deserialize::<H::Params>().map_err(|e| {
                    ToolError::validation("arguments", ValidationReason::Invalid(e.to_string()))
                })?;
                handler.call(&ctx, params).await
            })
        })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Wire definitions of every tool, sorted by name.
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools = self
            .tools
            .values()
            .map(|entry| entry.definition.to_tool())
            .collect::<Vec<_>>();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Validate `arguments` and run the named tool.
    ///
    /// Every failure, including a panicking handler, comes back as a
    /// [`ToolError`]; nothing escapes this call.
    pub async fn dispatch(
        &self,
        ctx: &ServerCtx,
        name: &str,
        arguments: Option<Arguments>,
    ) -> ToolResult {
        let started = Instant::now();
        let result = self.dispatch_inner(ctx, name, arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(tool = name, elapsed_ms, "Tool call succeeded"),
            Err(e) => warn!(
                tool = name,
                error_kind = e.kind.as_str(),
                elapsed_ms,
                "Tool call failed: {}",
                e.message
            ),
        }
        result
    }

    async fn dispatch_inner(
        &self,
        ctx: &ServerCtx,
        name: &str,
        arguments: Option<Arguments>,
    ) -> ToolResult {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::unknown_tool(name))?;
        let arguments = entry.definition.parameters.validate(arguments)?;
        if ctx.is_cancelled() {
            return Err(ToolError::cancelled());
        }

        match AssertUnwindSafe((entry.handler)(ctx, arguments))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(ToolError::internal(format!(
                "Tool '{name}' panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// Dispatch and fold every failure except an unknown tool into a result.
    pub async fn call_tool(
        &self,
        ctx: &ServerCtx,
        name: &str,
        arguments: Option<Arguments>,
    ) -> Result<CallToolResult> {
        match self.dispatch(ctx, name, arguments).await {
            Ok(result) => Ok(result),
            Err(ToolError {
                kind: ToolErrorKind::UnknownTool,
                ..
            }) => Err(Error::ToolNotFound(name.to_string())),
            Err(e) => Ok(e.into()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::{params::ParamType, testutils::TestServerContext};

    #[derive(Deserialize)]
    struct EchoParams {
        message: String,
        #[serde(default)]
        repeat: Option<u32>,
    }

    struct Echo {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for Echo {
        type Params = EchoParams;

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo a message").with_parameters(
                ParameterSchema::new()
                    .required("message", ParamType::String, "Text to echo")
                    .optional("repeat", ParamType::Integer, "How many times"),
            )
        }

        async fn call(&self, _ctx: &ServerCtx, params: EchoParams) -> ToolResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = params.message.repeat(params.repeat.unwrap_or(1) as usize);
            Ok(CallToolResult::new().with_text_content(text))
        }
    }

    fn echo_set() -> (ToolSet, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolSet::new();
        tools
            .register_handler(Echo {
                calls: calls.clone(),
            })
            .unwrap();
        (tools, calls)
    }

    #[tokio::test]
    async fn test_dispatch_typed_handler() {
        let (tools, calls) = echo_set();
        let ctx = TestServerContext::new();
        let args = Arguments::new().set("message", "ab").set("repeat", 2);
        let result = tools.dispatch(ctx.ctx(), "echo", Some(args)).await.unwrap();
        assert_eq!(result.text(), Some("abab"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_whole_float_reaches_integer_param() {
        let (tools, calls) = echo_set();
        let ctx = TestServerContext::new();
        let args = Arguments::from_value(json!({"message": "ab", "repeat": 3.0})).unwrap();
        let result = tools.dispatch(ctx.ctx(), "echo", Some(args)).await.unwrap();
        assert_eq!(result.text(), Some("ababab"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let args = Arguments::from_value(json!({"message": "ab", "repeat": 2.5})).unwrap();
        let err = tools.dispatch(ctx.ctx(), "echo", Some(args)).await.unwrap_err();
        assert!(matches!(
            err.kind,
            ToolErrorKind::Validation { ref parameter, .. } if parameter == "repeat"
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_never_invokes_handler() {
        let (tools, calls) = echo_set();
        let ctx = TestServerContext::new();
        let err = tools.dispatch(ctx.ctx(), "nope", None).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::UnknownTool);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let err = tools.call_tool(ctx.ctx(), "nope", None).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_validation_precedes_handler() {
        let (tools, calls) = echo_set();
        let ctx = TestServerContext::new();

        let err = tools.dispatch(ctx.ctx(), "echo", None).await.unwrap_err();
        assert_eq!(
            err.kind,
            ToolErrorKind::Validation {
                parameter: "message".into(),
                reason: ValidationReason::Missing,
            }
        );

        let result = tools
            .call_tool(
                ctx.ctx(),
                "echo",
                Some(Arguments::new().set("message", json!(1))),
            )
            .await
            .unwrap();
        assert_eq!(result.error_kind(), Some("validation"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_leaves_set_unchanged() {
        let (mut tools, _) = echo_set();
        let before = tools.list_tools();
        let err = tools
            .register(ToolDefinition::new("echo", "other"), |_ctx, _args| {
                Box::pin(async { Ok(CallToolResult::new()) })
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "echo"));
        assert_eq!(tools.len(), 1);
        let after = tools.list_tools();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].description.as_deref(), Some("Echo a message"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut tools = ToolSet::new();
        let err = tools
            .register(ToolDefinition::new("  ", "blank"), |_ctx, _args| {
                Box::pin(async { Ok(CallToolResult::new()) })
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert!(tools.is_empty());
    }

    fn explode() -> ToolResult {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_internal() {
        let mut tools = ToolSet::new();
        tools
            .register(ToolDefinition::new("boom", "Always panics"), |_ctx, _args| {
                Box::pin(async { explode() })
            })
            .unwrap();
        let ctx = TestServerContext::new();
        let err = tools.dispatch(ctx.ctx(), "boom", None).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Internal);
        assert!(err.message.contains("kaboom"));
    }

    #[test]
    fn test_list_tools_sorted() {
        let mut tools = ToolSet::new();
        for name in ["zeta", "alpha", "mid"] {
            tools
                .register(ToolDefinition::new(name, name), |_ctx, _args| {
                    Box::pin(async { Ok(CallToolResult::new()) })
                })
                .unwrap();
        }
        let names: Vec<_> = tools.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }
}

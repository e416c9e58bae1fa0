use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    codec::Incoming,
    connection::ServerHandler,
    context::ServerCtx,
    error::{Error, Result},
    jsonrpc::{create_jsonrpc_error, create_jsonrpc_notification, result_to_jsonrpc_response},
    schema::*,
    transport::{GenericDuplex, StdioTransport, StreamTransport, Transport},
};

/// Capacity of the per-connection notification channel.
const NOTIFICATION_CAPACITY: usize = 100;

/// Cancellation tokens of requests still being handled, keyed by request id.
///
/// Each entry carries the generation it was spawned with, so a finished task
/// only removes its own entry even when the client reused the id.
#[derive(Clone, Default)]
struct InFlight {
    calls: Arc<DashMap<String, (u64, CancellationToken)>>,
    next_generation: Arc<AtomicU64>,
}

impl InFlight {
    /// Track `token` under `key`, returning its generation.
    fn track(&self, key: String, token: CancellationToken) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if self.calls.insert(key.clone(), (generation, token)).is_some() {
            warn!("Request id {} reused while still in flight", key);
        }
        generation
    }

    /// Forget `key` if it still belongs to `generation`.
    fn finish(&self, key: &str, generation: u64) {
        self.calls.remove_if(key, |_, (current, _)| *current == generation);
    }

    /// Cancel the call tracked under `key`; false if there is none.
    fn cancel(&self, key: &str) -> bool {
        match self.calls.remove(key) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        self.calls.clear();
    }
}

/// MCP Server implementation
pub struct Server<F> {
    /// Factory for creating per-connection handlers.
    connection_factory: F,
}

impl Server<()> {
    /// Create a new server with a handler factory.
    ///
    /// The factory function is called once for each connection, allowing each
    /// connection to have its own handler instance. Capabilities are whatever
    /// the handler's [`ServerHandler::initialize`] returns.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut tools = ToolSet::new();
    /// tools.register_handler(MyTool)?;
    /// let handler = ToolServer::new("my-server", "1.0.0", Arc::new(tools));
    /// Server::new(move || handler.clone()).serve_stdio().await?;
    /// ```
    pub fn new<C, G>(
        factory: G,
    ) -> Server<impl Fn() -> Box<dyn ServerHandler> + Clone + Send + Sync + 'static>
    where
        C: ServerHandler + 'static,
        G: Fn() -> C + Clone + Send + Sync + 'static,
    {
        Server {
            connection_factory: move || Box::new(factory()) as Box<dyn ServerHandler>,
        }
    }
}

impl<F> Server<F>
where
    F: Fn() -> Box<dyn ServerHandler> + Send + Sync + 'static,
{
    /// Serve a single connection using the provided transport and wait for it to end.
    pub(crate) async fn serve(self, transport: Box<dyn Transport>) -> Result<()> {
        let handle = ServerHandle::new(self, transport).await?;
        handle
            .handle
            .await
            .map_err(|e| Error::InternalError(format!("Server task failed: {e}")))
    }

    /// Serve one connection over stdin/stdout.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(Box::new(StdioTransport::new())).await
    }

    /// Serve one connection over a reader/writer pair.
    pub async fn serve_stream<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let duplex = GenericDuplex::new(reader, writer);
        self.serve(Box::new(StreamTransport::new(duplex))).await
    }
}

/// Handle for controlling a running MCP server instance
pub struct ServerHandle {
    /// Join handle for the server task.
    pub handle: JoinHandle<()>,
    /// Cancelled to stop the server; parent of every request token.
    shutdown_token: CancellationToken,
}

impl ServerHandle {
    /// Start serving the transport in a background task.
    pub(crate) async fn new<F>(server: Server<F>, mut transport: Box<dyn Transport>) -> Result<Self>
    where
        F: Fn() -> Box<dyn ServerHandler> + Send + Sync + 'static,
    {
        transport.connect().await?;
        let remote_addr = transport.remote_addr();
        let (mut sink, mut stream) = transport.framed()?.split::<JSONRPCMessage>();

        info!("MCP server started on {}", remote_addr);
        let (notification_tx, mut notification_rx) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<JSONRPCMessage>();

        let connection: Arc<dyn ServerHandler> = Arc::from((server.connection_factory)());
        let shutdown_token = CancellationToken::new();
        let server_ctx = ServerCtx::new(notification_tx, shutdown_token.clone());
        let in_flight = InFlight::default();
        let token = shutdown_token.clone();

        let handle = tokio::spawn(async move {
            let mut initialized = false;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Server received shutdown signal");
                        break;
                    }
                    result = stream.next() => {
                        let message = match result {
                            Some(Ok(Incoming::Message(message))) => message,
                            Some(Ok(Incoming::Malformed { code, message, id })) => {
                                let reply = create_jsonrpc_error(id, code, message, None);
                                if let Err(e) = sink.send(reply).await {
                                    error!("Error sending error response: {}", e);
                                    break;
                                }
                                continue;
                            }
                            Some(Err(e)) => {
                                error!("Error reading message: {}", e);
                                break;
                            }
                            None => {
                                info!("Client disconnected");
                                break;
                            }
                        };
                        match message {
                            JSONRPCMessage::Request(request) if request.request.method == "initialize" => {
                                // Answered inline so nothing overtakes the handshake.
                                let ctx = server_ctx.for_request(request.id.clone(), token.child_token());
                                let response = handle_request(connection.as_ref(), request, &ctx).await;
                                let accepted = matches!(response, JSONRPCMessage::Response(JSONRPCResponse::Result(_)));
                                if let Err(e) = sink.send(response).await {
                                    error!("Error sending initialize response: {}", e);
                                    break;
                                }
                                if accepted && !initialized {
                                    if let Err(e) = connection.on_connect(&server_ctx, &remote_addr).await {
                                        error!("Error during on_connect: {}", e);
                                        break;
                                    }
                                    initialized = true;
                                }
                            }
                            JSONRPCMessage::Request(request) => {
                                spawn_request_handler(
                                    connection.clone(),
                                    request,
                                    response_tx.clone(),
                                    &server_ctx,
                                    &in_flight,
                                );
                            }
                            JSONRPCMessage::Notification(notification) => {
                                if let Err(e) = handle_notification(
                                    connection.as_ref(),
                                    notification,
                                    &server_ctx,
                                    &in_flight,
                                )
                                .await
                                {
                                    error!("Error handling notification: {}", e);
                                }
                            }
                            JSONRPCMessage::Response(_) => {
                                debug!("Ignoring response from client; this server sends no requests");
                            }
                        }
                    }

                    // Forward internal notifications to client
                    notification = notification_rx.recv() => {
                        match notification {
                            Ok(notification) => {
                                let message = JSONRPCMessage::Notification(create_jsonrpc_notification(&notification));
                                if let Err(e) = sink.send(message).await {
                                    error!("Error sending notification to client: {}", e);
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!("Dropped {} notifications for a slow client", skipped);
                            }
                            Err(broadcast::error::RecvError::Closed) => {}
                        }
                    }

                    // Send queued responses to client
                    Some(response) = response_rx.recv() => {
                        if let Err(e) = sink.send(response).await {
                            error!("Error sending response to client: {}", e);
                            break;
                        }
                    }
                }
            }

            // Abort everything still running for this connection.
            token.cancel();
            in_flight.clear();

            if let Err(e) = connection.on_shutdown().await {
                error!("Error during server shutdown: {}", e);
            }
            info!("MCP server stopped");
        });

        Ok(Self {
            handle,
            shutdown_token,
        })
    }

    /// Start serving a reader/writer pair, returning a handle for runtime control.
    pub async fn from_stream<F, R, W>(server: Server<F>, reader: R, writer: W) -> Result<Self>
    where
        F: Fn() -> Box<dyn ServerHandler> + Send + Sync + 'static,
        R: AsyncRead + Send + Sync + Unpin + 'static,
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let duplex = GenericDuplex::new(reader, writer);
        Self::new(server, Box::new(StreamTransport::new(duplex))).await
    }

    /// Stop the server, cancelling every in-flight request, and wait for it to finish.
    pub async fn stop(self) -> Result<()> {
        self.shutdown_token.cancel();
        self.handle
            .await
            .map_err(|e| Error::InternalError(format!("Server task failed: {e}")))?;
        Ok(())
    }
}

/// Spawn a task to handle a request and queue its response.
///
/// The task runs under a child token of the connection. When that token is
/// cancelled the handler future is dropped, which aborts any outbound I/O, and
/// no response is written.
fn spawn_request_handler(
    connection: Arc<dyn ServerHandler>,
    request: JSONRPCRequest,
    response_tx: mpsc::UnboundedSender<JSONRPCMessage>,
    context: &ServerCtx,
    in_flight: &InFlight,
) {
    let key = request.id.to_key();
    let token = context.cancellation_token().child_token();
    let generation = in_flight.track(key.clone(), token.clone());
    let ctx = context.for_request(request.id.clone(), token.clone());
    let in_flight = in_flight.clone();

    tokio::spawn(async move {
        let id = request.id.clone();
        let response = tokio::select! {
            _ = token.cancelled() => None,
            response = handle_request(connection.as_ref(), request, &ctx) => Some(response),
        };
        in_flight.finish(&key, generation);

        match response {
            Some(response) if !token.is_cancelled() => {
                debug!("Server sending response for {}", id);
                if let Err(e) = response_tx.send(response) {
                    debug!("Dropping response for {}: {}", id, e);
                }
            }
            _ => info!("Request {} cancelled; no response sent", id),
        }
    });
}

/// Handle a request and convert the outcome to a JSON-RPC response.
async fn handle_request(
    connection: &dyn ServerHandler,
    request: JSONRPCRequest,
    context: &ServerCtx,
) -> JSONRPCMessage {
    debug!(
        "Server handling request: {} method: {}",
        request.id, request.request.method
    );
    let JSONRPCRequest {
        id,
        request: Request { method, params },
        ..
    } = request;
    let result = match parse_client_request(method, params) {
        Ok(client_request) => dispatch_client_request(connection, context, client_request).await,
        Err(e) => Err(e),
    };
    result_to_jsonrpc_response(id, result)
}

/// Parse a client request from the JSON-RPC method and params payload.
fn parse_client_request(method: String, params: Option<RequestParams>) -> Result<ClientRequest> {
    let mut request_obj = serde_json::Map::new();
    request_obj.insert(
        "method".to_string(),
        serde_json::Value::String(method.clone()),
    );
    if let Some(params) = params {
        if let Some(meta) = params._meta {
            request_obj.insert("_meta".to_string(), serde_json::to_value(meta)?);
        }
        for (key, value) in params.other {
            request_obj.insert(key, value);
        }
    }

    match serde_json::from_value::<ClientRequest>(serde_json::Value::Object(request_obj)) {
        Ok(req) => Ok(req),
        Err(err) => {
            if err.to_string().contains("unknown variant") {
                Err(Error::MethodNotFound(method))
            } else {
                Err(Error::InvalidParams(format!(
                    "Invalid parameters for {method}: {err}"
                )))
            }
        }
    }
}

/// Dispatch a parsed client request to the appropriate handler.
async fn dispatch_client_request(
    conn: &dyn ServerHandler,
    ctx: &ServerCtx,
    request: ClientRequest,
) -> Result<serde_json::Value> {
    match request {
        ClientRequest::Initialize {
            protocol_version,
            capabilities,
            client_info,
            _meta: _,
        } => serialize_result(
            conn.initialize(ctx, protocol_version, *capabilities, client_info)
                .await,
        ),
        ClientRequest::Ping { .. } => empty_result(conn.pong(ctx).await),
        ClientRequest::ListTools { cursor, _meta: _ } => {
            serialize_result(conn.list_tools(ctx, cursor).await)
        }
        ClientRequest::CallTool {
            name,
            arguments,
            _meta: _,
        } => serialize_result(conn.call_tool(ctx, name, arguments).await),
        ClientRequest::SetLevel { level, _meta: _ } => {
            empty_result(conn.set_level(ctx, level).await)
        }
    }
}

/// Serialize a handler result into JSON for a JSON-RPC response.
fn serialize_result<T: Serialize>(result: Result<T>) -> Result<serde_json::Value> {
    result.and_then(|value| serde_json::to_value(value).map_err(Into::into))
}

/// Convert a unit result into an empty JSON object response.
fn empty_result(result: Result<()>) -> Result<serde_json::Value> {
    result.map(|_| serde_json::json!({}))
}

/// Handle a client notification, cancelling the target request first if asked.
async fn handle_notification(
    connection: &dyn ServerHandler,
    notification: JSONRPCNotification,
    context: &ServerCtx,
    in_flight: &InFlight,
) -> Result<()> {
    debug!(
        "Received notification: {}",
        notification.notification.method
    );

    // Build a value that matches the shape expected by ClientNotification.
    let mut object = serde_json::Map::new();
    object.insert(
        "method".to_string(),
        serde_json::Value::String(notification.notification.method.clone()),
    );
    if let Some(params) = notification.notification.params {
        if let Some(meta) = params._meta {
            object.insert("_meta".to_string(), serde_json::to_value(meta)?);
        }
        for (k, v) in params.other {
            object.insert(k, v);
        }
    }

    let typed = match serde_json::from_value::<ClientNotification>(serde_json::Value::Object(object)) {
        Ok(typed) => typed,
        Err(e) => {
            warn!("Ignoring unrecognised client notification: {}", e);
            return Ok(());
        }
    };

    if let ClientNotification::Cancelled {
        request_id: Some(request_id),
        reason,
        ..
    } = &typed
    {
        if in_flight.cancel(&request_id.to_key()) {
            info!(
                "Cancelled request {} ({})",
                request_id,
                reason.as_deref().unwrap_or("no reason given")
            );
        } else {
            debug!("Cancellation for unknown or finished request {}", request_id);
        }
    }

    connection.notification(context, typed).await
}

//! Test utilities for `wxmcp`.
//!
//! Helpers shared by this crate's tests and by downstream tool crates: in-memory
//! duplex pipes, a [`ServerCtx`] with an observable notification channel, and a
//! raw line-level client that speaks newline-delimited JSON-RPC to an
//! in-process server.

use serde_json::{Value, json};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines},
    sync::broadcast,
    time::{Duration, timeout},
};
use tokio_util::sync::CancellationToken;

use crate::{
    Server, ServerCtx, ServerHandle, ServerHandler,
    error::{Error, Result},
    schema::{LATEST_PROTOCOL_VERSION, ServerNotification},
};

/// How long [`TestClient::recv`] waits for a line before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Create two independent in-memory duplex pipes forming a bidirectional
/// channel.
///
/// The first two elements go to the server (`reader`, `writer`), the remaining
/// pair to the client.
pub fn make_duplex_pair() -> (
    impl AsyncRead + Send + Sync + Unpin + 'static,
    impl AsyncWrite + Send + Sync + Unpin + 'static,
    impl AsyncRead + Send + Sync + Unpin + 'static,
    impl AsyncWrite + Send + Sync + Unpin + 'static,
) {
    // 8 KiB per side is plenty for test traffic.
    let (server_reader, client_writer) = io::duplex(8 * 1024);
    let (client_reader, server_writer) = io::duplex(8 * 1024);
    (server_reader, server_writer, client_reader, client_writer)
}

/// Line-level JSON-RPC client for driving a server in tests.
pub struct TestClient {
    reader: Lines<BufReader<Box<dyn AsyncRead + Send + Sync + Unpin>>>,
    writer: Box<dyn AsyncWrite + Send + Sync + Unpin>,
}

impl TestClient {
    /// Wrap the client side of a duplex pair.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Sync + Unpin> = Box::new(reader);
        Self {
            reader: BufReader::new(reader).lines(),
            writer: Box::new(writer),
        }
    }

    /// Write one raw line, appending the newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write one JSON value as a line.
    pub async fn send(&mut self, message: Value) -> Result<()> {
        let line = serde_json::to_string(&message)?;
        self.send_line(&line).await
    }

    /// Send a request without waiting for the response.
    pub async fn send_request(&mut self, id: Value, method: &str, params: Value) -> Result<()> {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await
    }

    /// Send a notification.
    pub async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        self.send(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    /// Read the next message from the server.
    pub async fn recv(&mut self) -> Result<Value> {
        let line = timeout(RECV_TIMEOUT, self.reader.next_line())
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: RECV_TIMEOUT.as_millis() as u64,
            })??
            .ok_or(Error::ConnectionClosed)?;
        Ok(serde_json::from_str(&line)?)
    }

    /// Read the next message, or `None` if nothing arrives within `wait`.
    pub async fn try_recv(&mut self, wait: Duration) -> Option<Value> {
        let line = timeout(wait, self.reader.next_line()).await.ok()?.ok()??;
        serde_json::from_str(&line).ok()
    }

    /// Read messages until the response for `id` arrives, skipping notifications.
    pub async fn recv_response(&mut self, id: &Value) -> Result<Value> {
        loop {
            let message = self.recv().await?;
            if message.get("id") == Some(id) {
                return Ok(message);
            }
        }
    }

    /// Send a request and wait for its response.
    pub async fn request(&mut self, id: Value, method: &str, params: Value) -> Result<Value> {
        self.send_request(id.clone(), method, params).await?;
        self.recv_response(&id).await
    }

    /// Perform the initialize handshake and return the initialize result.
    pub async fn initialize(&mut self) -> Result<Value> {
        let response = self
            .request(
                json!(0),
                "initialize",
                json!({
                    "protocolVersion": LATEST_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0.0"},
                }),
            )
            .await?;
        self.notify("notifications/initialized", json!({})).await?;
        Ok(response["result"].clone())
    }

    /// Call a tool and return the whole JSON-RPC response.
    pub async fn call_tool(&mut self, id: Value, name: &str, arguments: Value) -> Result<Value> {
        self.request(
            id,
            "tools/call",
            json!({"name": name, "arguments": arguments}),
        )
        .await
    }
}

/// Start an in-process server over duplex pipes and connect a [`TestClient`].
///
/// The client is not initialized.
pub async fn serve_in_memory<C, G>(factory: G) -> Result<(TestClient, ServerHandle)>
where
    C: ServerHandler + 'static,
    G: Fn() -> C + Clone + Send + Sync + 'static,
{
    let (server_reader, server_writer, client_reader, client_writer) = make_duplex_pair();
    let handle = ServerHandle::from_stream(Server::new(factory), server_reader, server_writer).await?;
    Ok((TestClient::new(client_reader, client_writer), handle))
}

/// Create a ServerCtx for testing purposes.
pub fn test_server_ctx(notification_tx: broadcast::Sender<ServerNotification>) -> ServerCtx {
    ServerCtx::new(notification_tx, CancellationToken::new())
}

/// Test context for [`ServerHandler`] and tool handler implementations.
pub struct TestServerContext {
    /// Server context for tests.
    ctx: ServerCtx,
    /// Receiver for server notifications.
    notification_rx: broadcast::Receiver<ServerNotification>,
}

impl TestServerContext {
    /// Create a new test server context with notification channels
    pub fn new() -> Self {
        let (notification_tx, notification_rx) = broadcast::channel(100);
        let ctx = test_server_ctx(notification_tx);
        Self {
            ctx,
            notification_rx,
        }
    }

    /// Get a reference to the ServerCtx
    pub fn ctx(&self) -> &ServerCtx {
        &self.ctx
    }

    /// Try to receive a notification, returning None if no notification is available
    pub async fn try_recv_notification(&mut self) -> Option<ServerNotification> {
        timeout(Duration::from_millis(10), self.notification_rx.recv())
            .await
            .ok()
            .and_then(|result| result.ok())
    }
}

impl Default for TestServerContext {
    fn default() -> Self {
        Self::new()
    }
}

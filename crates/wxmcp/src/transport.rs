use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::Framed;

use crate::{
    codec::{Incoming, JsonRpcCodec},
    error::{Error, Result},
    schema::JSONRPCMessage,
};

/// A framed, bidirectional stream of JSON-RPC messages.
pub trait TransportStream:
    Stream<Item = Result<Incoming>> + Sink<JSONRPCMessage, Error = Error> + Send + Unpin
{
}

impl<T> TransportStream for T where
    T: Stream<Item = Result<Incoming>> + Sink<JSONRPCMessage, Error = Error> + Send + Unpin
{
}

/// A byte channel between the host and this server.
#[async_trait]
pub trait Transport: Send {
    /// Prepare the underlying channel.
    async fn connect(&mut self) -> Result<()>;

    /// Consume the transport, yielding the framed message stream.
    fn framed(self: Box<Self>) -> Result<Box<dyn TransportStream>>;

    /// Human-readable peer description, used in logs.
    fn remote_addr(&self) -> String;
}

/// Transport over any pre-connected duplex byte stream.
pub struct StreamTransport<S> {
    stream: S,
    remote_addr: String,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            remote_addr: "stream".to_string(),
        }
    }

    /// Override the peer description reported by [`Transport::remote_addr`].
    pub fn with_remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = remote_addr.into();
        self
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn framed(self: Box<Self>) -> Result<Box<dyn TransportStream>> {
        Ok(Box::new(Framed::new(self.stream, JsonRpcCodec::new())))
    }

    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }
}

/// Transport over the process's stdin and stdout.
pub struct StdioTransport {
    inner: StreamTransport<GenericDuplex<tokio::io::Stdin, tokio::io::Stdout>>,
}

impl StdioTransport {
    /// Create a transport bound to stdin/stdout.
    pub fn new() -> Self {
        let duplex = GenericDuplex::new(tokio::io::stdin(), tokio::io::stdout());
        Self {
            inner: StreamTransport::new(duplex).with_remote_addr("stdio"),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&mut self) -> Result<()> {
        self.inner.connect().await
    }

    fn framed(self: Box<Self>) -> Result<Box<dyn TransportStream>> {
        Box::new(self.inner).framed()
    }

    fn remote_addr(&self) -> String {
        self.inner.remote_addr()
    }
}

/// Joins a separate reader and writer into one duplex stream.
pub struct GenericDuplex<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> GenericDuplex<R, W> {
    /// Pair a reader with a writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> AsyncRead for GenericDuplex<R, W>
where
    R: AsyncRead + Unpin,
    W: Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

impl<R, W> AsyncWrite for GenericDuplex<R, W>
where
    R: Unpin,
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.writer).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;
    use crate::testutils::make_duplex_pair;

    #[tokio::test]
    async fn test_stream_transport_frames_lines() {
        let (server_reader, server_writer, client_reader, mut client_writer) = make_duplex_pair();
        let transport: Box<dyn Transport> = Box::new(StreamTransport::new(GenericDuplex::new(
            server_reader,
            server_writer,
        )));
        assert_eq!(transport.remote_addr(), "stream");
        let mut framed = transport.framed().unwrap();

        client_writer
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        let incoming = framed.next().await.unwrap().unwrap();
        assert!(matches!(
            incoming,
            Incoming::Message(JSONRPCMessage::Request(_))
        ));

        let reply: JSONRPCMessage = serde_json::from_str(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}",
        )
        .unwrap();
        framed.send(reply).await.unwrap();

        let mut lines = BufReader::new(client_reader).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], 1);
    }
}

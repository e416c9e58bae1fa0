use bytes::{BufMut, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::{
    error::Error,
    schema::{INVALID_REQUEST, JSONRPCMessage, PARSE_ERROR, RequestId},
};

/// Longest line accepted before the stream is treated as corrupt.
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// One decoded line from the peer.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// A well-formed JSON-RPC message.
    Message(JSONRPCMessage),
    /// A line that could not be read as a JSON-RPC message.
    Malformed {
        /// JSON-RPC error code to answer with.
        code: i32,
        /// Description of the problem.
        message: String,
        /// Request id, when the line was JSON and carried one.
        id: Option<RequestId>,
    },
}

/// Newline-delimited JSON-RPC framing.
///
/// Each message occupies exactly one line. Blank lines are skipped and a
/// trailing `\r` is tolerated. A line that fails to parse is surfaced as
/// [`Incoming::Malformed`] rather than as a stream error, so one bad line does
/// not end the connection.
#[derive(Debug, Default)]
pub struct JsonRpcCodec {
    /// Bytes already scanned for a newline in the current buffer.
    next_index: usize,
}

impl JsonRpcCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_line(line: &[u8]) -> Incoming {
        let value: Value = match serde_json::from_slice(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable line from peer: {}", e);
                return Incoming::Malformed {
                    code: PARSE_ERROR,
                    message: format!("Parse error: {e}"),
                    id: None,
                };
            }
        };
        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
        match serde_json::from_value::<JSONRPCMessage>(value) {
            Ok(message) => Incoming::Message(message),
            Err(e) => {
                warn!("Invalid JSON-RPC message from peer: {}", e);
                Incoming::Malformed {
                    code: INVALID_REQUEST,
                    message: format!("Invalid request: {e}"),
                    id,
                }
            }
        }
    }
}

fn trim_line(mut line: &[u8]) -> &[u8] {
    while let Some((last, rest)) = line.split_last() {
        if last.is_ascii_whitespace() {
            line = rest;
        } else {
            break;
        }
    }
    while let Some((first, rest)) = line.split_first() {
        if first.is_ascii_whitespace() {
            line = rest;
        } else {
            break;
        }
    }
    line
}

impl Decoder for JsonRpcCodec {
    type Item = Incoming;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                if buf.len() > MAX_LINE_LENGTH {
                    return Err(Error::Transport(format!(
                        "line exceeds {MAX_LINE_LENGTH} bytes"
                    )));
                }
                self.next_index = buf.len();
                return Ok(None);
            };
            let line = buf.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            let line = trim_line(&line);
            if line.is_empty() {
                continue;
            }
            debug!("Received: {}", String::from_utf8_lossy(line));
            return Ok(Some(Self::parse_line(line)));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(buf)? {
            return Ok(Some(item));
        }
        let rest = buf.split();
        self.next_index = 0;
        let line = trim_line(&rest);
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self::parse_line(line)))
        }
    }
}

impl Encoder<JSONRPCMessage> for JsonRpcCodec {
    type Error = Error;

    fn encode(&mut self, item: JSONRPCMessage, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)?;
        debug!("Sending: {}", String::from_utf8_lossy(&json));
        buf.reserve(json.len() + 1);
        buf.put_slice(&json);
        buf.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::JSONRPCResponse;

    fn decode_all(input: &str) -> Vec<Incoming> {
        let mut codec = JsonRpcCodec::new();
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(item) = codec.decode(&mut buf).unwrap() {
            out.push(item);
        }
        if let Some(item) = codec.decode_eof(&mut buf).unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let items = decode_all(
            "\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\r\n\r\n   \n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        );
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Incoming::Message(JSONRPCMessage::Request(_))));
        assert!(matches!(
            items[1],
            Incoming::Message(JSONRPCMessage::Notification(_))
        ));
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let mut codec = JsonRpcCodec::new();
        let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\",");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"\"id\":2,\"method\":\"ping\"}\n");
        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(Incoming::Message(JSONRPCMessage::Request(_)))
        ));
    }

    #[test]
    fn test_malformed_line_is_reported_not_fatal() {
        let items = decode_all("this is not json\n{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");
        assert_eq!(items.len(), 2);
        match &items[0] {
            Incoming::Malformed { code, id, .. } => {
                assert_eq!(*code, PARSE_ERROR);
                assert!(id.is_none());
            }
            other => panic!("expected malformed line, got {other:?}"),
        }
        assert!(matches!(items[1], Incoming::Message(_)));
    }

    #[test]
    fn test_invalid_request_keeps_id() {
        let items = decode_all("{\"id\": 9, \"foo\": true}\n");
        match &items[0] {
            Incoming::Malformed { code, id, .. } => {
                assert_eq!(*code, INVALID_REQUEST);
                assert_eq!(id, &Some(RequestId::Number(9)));
            }
            other => panic!("expected malformed line, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_appends_newline() {
        let message: JSONRPCMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {}
        }))
        .unwrap();
        assert!(matches!(
            message,
            JSONRPCMessage::Response(JSONRPCResponse::Result(_))
        ));
        let mut buf = BytesMut::new();
        JsonRpcCodec::new().encode(message, &mut buf).unwrap();
        assert!(buf.ends_with(b"\n"));
        assert_eq!(buf.iter().filter(|b| **b == b'\n').count(), 1);
    }
}

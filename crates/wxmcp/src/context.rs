use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    schema::{self, LoggingLevel},
};

/// Context provided to `ServerHandler` implementations and tool handlers.
///
/// One context exists per connection; each request gets a copy carrying that
/// request's id and cancellation token. The Clone implementation is for
/// internal framework use only.
#[derive(Clone)]
pub struct ServerCtx {
    /// Sender for server notifications
    pub(crate) notification_tx: broadcast::Sender<schema::ServerNotification>,
    /// The current request ID, if this context is handling a request
    pub(crate) request_id: Option<schema::RequestId>,
    /// Cancelled when the host cancels this request or the connection closes
    cancellation: CancellationToken,
    /// Minimum level forwarded as `notifications/message`, shared per connection
    log_level: Arc<RwLock<LoggingLevel>>,
}

impl ServerCtx {
    /// Create a new connection-level ServerCtx
    pub(crate) fn new(
        notification_tx: broadcast::Sender<schema::ServerNotification>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            notification_tx,
            request_id: None,
            cancellation,
            log_level: Arc::new(RwLock::new(LoggingLevel::Info)),
        }
    }

    /// Create a new context for a specific request
    pub(crate) fn for_request(
        &self,
        request_id: schema::RequestId,
        cancellation: CancellationToken,
    ) -> Self {
        let mut ctx = self.clone();
        ctx.request_id = Some(request_id);
        ctx.cancellation = cancellation;
        ctx
    }

    /// Send a notification to the client
    pub fn notify(&self, notification: schema::ServerNotification) -> Result<()> {
        self.notification_tx
            .send(notification)
            .map_err(|_| Error::InternalError("Failed to send notification".into()))?;
        Ok(())
    }

    /// Id of the request being handled, if any.
    pub fn request_id(&self) -> Option<&schema::RequestId> {
        self.request_id.as_ref()
    }

    /// Whether this request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once this request is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// The request's cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Minimum level currently forwarded to the client.
    pub fn log_level(&self) -> LoggingLevel {
        *self.log_level.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the minimum level forwarded to the client for this connection.
    pub fn set_log_level(&self, level: LoggingLevel) {
        *self.log_level.write().unwrap_or_else(|e| e.into_inner()) = level;
    }

    /// Send a `notifications/message` to the client.
    ///
    /// Messages below the connection's level are dropped silently.
    pub fn log(
        &self,
        level: LoggingLevel,
        logger: Option<&str>,
        data: impl Into<Value>,
    ) -> Result<()> {
        if level < self.log_level() {
            return Ok(());
        }
        self.notify(schema::ServerNotification::logging_message(
            level,
            logger.map(str::to_string),
            data.into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_respects_level() {
        let (tx, mut rx) = broadcast::channel(8);
        let ctx = ServerCtx::new(tx, CancellationToken::new());

        ctx.log(LoggingLevel::Debug, None, "dropped").unwrap();
        assert!(rx.try_recv().is_err());

        ctx.set_log_level(LoggingLevel::Debug);
        ctx.log(LoggingLevel::Debug, Some("weather"), "kept").unwrap();
        match rx.try_recv().unwrap() {
            schema::ServerNotification::LoggingMessage {
                level,
                logger,
                data,
                ..
            } => {
                assert_eq!(level, LoggingLevel::Debug);
                assert_eq!(logger.as_deref(), Some("weather"));
                assert_eq!(data, Value::from("kept"));
            }
        }
    }

    #[test]
    fn test_request_context_shares_level_but_not_token() {
        let (tx, _rx) = broadcast::channel(8);
        let connection = CancellationToken::new();
        let ctx = ServerCtx::new(tx, connection.clone());
        let request = ctx.for_request(schema::RequestId::Number(1), connection.child_token());

        request.cancellation_token().cancel();
        assert!(request.is_cancelled());
        assert!(!ctx.is_cancelled());

        ctx.set_log_level(LoggingLevel::Error);
        assert_eq!(request.log_level(), LoggingLevel::Error);
        assert_eq!(request.request_id(), Some(&schema::RequestId::Number(1)));
    }
}

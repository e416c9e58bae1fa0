use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::Result,
    schema::{self, *},
};

/// Create a JSONRPC notification from a typed server notification.
pub(crate) fn create_jsonrpc_notification(notification: &ServerNotification) -> JSONRPCNotification {
    let method = notification.method().to_string();
    let params = serde_json::to_value(notification)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .and_then(|mut obj| {
            obj.remove("method");
            let meta = obj
                .remove("_meta")
                .and_then(|value| value.as_object().cloned())
                .map(|map| map.into_iter().collect::<HashMap<_, _>>());
            if obj.is_empty() && meta.is_none() {
                None
            } else {
                Some(NotificationParams {
                    _meta: meta,
                    other: obj.into_iter().collect(),
                })
            }
        });

    JSONRPCNotification {
        jsonrpc: JSONRPC_VERSION.to_string(),
        notification: Notification { method, params },
    }
}

/// Create a JSONRPC error response.
///
/// `id` is `None` only when the offending message's id could not be read.
pub(crate) fn create_jsonrpc_error(
    id: Option<RequestId>,
    code: i32,
    message: String,
    data: Option<Value>,
) -> JSONRPCMessage {
    JSONRPCMessage::Response(JSONRPCResponse::Error(JSONRPCErrorResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        error: ErrorObject {
            code,
            message,
            data,
        },
    }))
}

/// Convert a Result<T> to a JSONRPC response
pub(crate) fn result_to_jsonrpc_response<T>(id: RequestId, result: Result<T>) -> JSONRPCMessage
where
    T: Serialize,
{
    let result = result.and_then(|value| serde_json::to_value(value).map_err(Into::into));
    match result {
        Ok(json_value) => {
            JSONRPCMessage::Response(JSONRPCResponse::Result(JSONRPCResultResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result: schema::JSONRpcResult {
                    _meta: None,
                    other: match json_value {
                        Value::Object(obj) => obj.into_iter().collect(),
                        Value::Null => HashMap::new(),
                        other => HashMap::from([("result".to_string(), other)]),
                    },
                },
            }))
        }
        Err(e) => match e.to_jsonrpc_response(id.clone()) {
            Some(jsonrpc_error) => JSONRPCMessage::Response(JSONRPCResponse::Error(jsonrpc_error)),
            None => create_jsonrpc_error(Some(id), INTERNAL_ERROR, e.to_string(), None),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Error;

    #[test]
    fn test_logging_notification_params() {
        let notification = create_jsonrpc_notification(&ServerNotification::logging_message(
            LoggingLevel::Warning,
            Some("weather".into()),
            json!("slow upstream"),
        ));
        assert_eq!(notification.notification.method, "notifications/message");
        let params = notification.notification.params.unwrap();
        assert_eq!(params.other["level"], "warning");
        assert_eq!(params.other["logger"], "weather");
        assert!(!params.other.contains_key("method"));
    }

    #[test]
    fn test_empty_result_is_object() {
        let message = result_to_jsonrpc_response(RequestId::Number(1), Ok(json!({})));
        let value = serde_json::to_value(message).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["result"], json!({}));
    }

    #[test]
    fn test_unmapped_error_is_internal() {
        let message = result_to_jsonrpc_response::<()>(
            RequestId::String("a".into()),
            Err(Error::ConnectionClosed),
        );
        let value = serde_json::to_value(message).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["error"]["code"], INTERNAL_ERROR);
    }
}

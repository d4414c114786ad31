//! Server-side requests and their results.
//!
//! A [`Request`] is built by a connection worker from an inbound [`Message`];
//! the worker pool turns it into exactly one [`RequestResult`].

use crate::message::{Message, MessageKind};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of actions a client can ask the server to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    ProtocolVersion,
    Connect,
    TileQuery,
    TileUpdate,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        Self::ProtocolVersion,
        Self::Connect,
        Self::TileQuery,
        Self::TileUpdate,
    ];

    /// Maps an inbound message kind to the request it asks for.
    ///
    /// Result kinds are server → client only and map to `None`.
    pub fn from_message_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::ProtocolVersion => Some(Self::ProtocolVersion),
            MessageKind::Connect => Some(Self::Connect),
            MessageKind::TileQuery => Some(Self::TileQuery),
            MessageKind::TileUpdate => Some(Self::TileUpdate),
            MessageKind::ProtocolVersionResult
            | MessageKind::ConnectResult
            | MessageKind::TileQueryResult
            | MessageKind::TileUpdateResult => None,
        }
    }

    /// Message kind used to answer this request.
    pub fn reply_kind(self) -> MessageKind {
        match self {
            Self::ProtocolVersion => MessageKind::ProtocolVersionResult,
            Self::Connect => MessageKind::ConnectResult,
            Self::TileQuery => MessageKind::TileQueryResult,
            Self::TileUpdate => MessageKind::TileUpdateResult,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProtocolVersion => "protocol_version",
            Self::Connect => "connect",
            Self::TileQuery => "tile_query",
            Self::TileUpdate => "tile_update",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an inbound message cannot become a [`Request`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Message kind {0} is not a request")]
    NotARequest(MessageKind),
    #[error("Malformed request arguments: {0}")]
    MalformedArguments(serde_json::Error),
}

/// A client-issued action awaiting execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: RequestId,
    kind: RequestKind,
    args: Value,
}

impl Request {
    pub fn new(kind: RequestKind, args: Value) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            args,
        }
    }

    /// Builds a request from an inbound message, parsing its payload as JSON.
    ///
    /// An empty payload is accepted and becomes `null` arguments.
    pub fn from_message(message: &Message) -> Result<Self, RequestError> {
        let kind = RequestKind::from_message_kind(message.kind())
            .ok_or(RequestError::NotARequest(message.kind()))?;

        let raw = message.raw_payload().trim();
        let args = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(raw).map_err(RequestError::MalformedArguments)?
        };

        Ok(Self::new(kind, args))
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn args(&self) -> &Value {
        &self.args
    }

    /// Deserializes the arguments into a typed payload.
    pub fn args_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.args)
    }
}

/// Outcome category of an executed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The handler ran and returned a payload
    Success,
    /// The handler returned an error or panicked
    Failure,
    /// No handler is registered for the request kind; the default path ran
    NotHandled,
}

/// The outcome of exactly one executed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    request_id: RequestId,
    kind: RequestKind,
    status: ResultStatus,
    payload: Value,
}

impl RequestResult {
    pub fn success(request: &Request, payload: Value) -> Self {
        Self::with_status(request, ResultStatus::Success, payload)
    }

    pub fn failure(request: &Request, reason: impl Into<String>) -> Self {
        let payload = serde_json::json!({ "result": false, "reason": reason.into() });
        Self::with_status(request, ResultStatus::Failure, payload)
    }

    pub fn not_handled(request: &Request) -> Self {
        let payload = serde_json::json!({
            "result": false,
            "reason": format!("no handler registered for {}", request.kind()),
        });
        Self::with_status(request, ResultStatus::NotHandled, payload)
    }

    fn with_status(request: &Request, status: ResultStatus, payload: Value) -> Self {
        Self {
            request_id: request.id(),
            kind: request.kind(),
            status,
            payload,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The message sent back to the client that issued the request.
    pub fn reply_message(&self) -> Message {
        Message::new(self.kind.reply_kind(), self.payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::TileQuery;

    #[test]
    fn test_request_from_message() {
        let message = Message::new(MessageKind::TileQuery, r#"{"layer":1,"x":2,"y":3}"#);
        let request = Request::from_message(&message).unwrap();

        assert_eq!(request.kind(), RequestKind::TileQuery);
        let query: TileQuery = request.args_as().unwrap();
        assert_eq!(query, TileQuery { layer: 1, x: 2, y: 3 });
    }

    #[test]
    fn test_result_messages_are_not_requests() {
        let message = Message::new(MessageKind::ConnectResult, "{}");
        assert!(matches!(
            Request::from_message(&message),
            Err(RequestError::NotARequest(MessageKind::ConnectResult))
        ));
    }

    #[test]
    fn test_empty_payload_becomes_null_args() {
        let request = Request::from_message(&Message::new(MessageKind::Connect, "")).unwrap();
        assert!(request.args().is_null());
    }

    #[test]
    fn test_malformed_args() {
        let message = Message::new(MessageKind::Connect, "Nothing");
        assert!(matches!(
            Request::from_message(&message),
            Err(RequestError::MalformedArguments(_))
        ));
    }

    #[test]
    fn test_every_request_kind_round_trips_through_message_kind() {
        for kind in RequestKind::ALL {
            let inbound = match kind {
                RequestKind::ProtocolVersion => MessageKind::ProtocolVersion,
                RequestKind::Connect => MessageKind::Connect,
                RequestKind::TileQuery => MessageKind::TileQuery,
                RequestKind::TileUpdate => MessageKind::TileUpdate,
            };
            assert_eq!(RequestKind::from_message_kind(inbound), Some(kind));
            assert!(kind.reply_kind().is_result());
        }
    }

    #[test]
    fn test_failure_result_reply() {
        let request = Request::new(RequestKind::Connect, Value::Null);
        let result = RequestResult::failure(&request, "boom");

        assert_eq!(result.status(), ResultStatus::Failure);
        assert_eq!(result.request_id(), request.id());

        let reply = result.reply_message();
        assert_eq!(reply.kind(), MessageKind::ConnectResult);
        let payload: Value = reply.payload().unwrap();
        assert_eq!(payload["result"], false);
        assert_eq!(payload["reason"], "boom");
    }

    #[test]
    fn test_not_handled_result() {
        let request = Request::new(RequestKind::TileUpdate, Value::Null);
        let result = RequestResult::not_handled(&request);
        assert_eq!(result.status(), ResultStatus::NotHandled);
        assert!(!result.is_success());
    }
}

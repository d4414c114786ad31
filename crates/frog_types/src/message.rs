//! The protocol envelope.
//!
//! A [`Message`] pairs a [`MessageKind`] with a raw payload string. Messages
//! are immutable once built; the payload is only interpreted by whoever
//! consumes a given kind.

use crate::codec::CodecError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Categories of protocol messages.
///
/// Request kinds travel client → server; the matching `*Result` kinds travel
/// back server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Client announces its protocol version right after the socket opens
    ProtocolVersion,
    /// Server verdict on the announced version
    ProtocolVersionResult,
    /// Authentication attempt
    Connect,
    /// Authentication outcome, carrying the session token on success
    ConnectResult,
    /// Read one tile of the world map
    TileQuery,
    /// Tile value (or absence of one)
    TileQueryResult,
    /// Write or clear one tile of the world map
    TileUpdate,
    /// Outcome of a tile write
    TileUpdateResult,
}

impl MessageKind {
    /// Returns true for kinds sent by the server in answer to a request.
    pub fn is_result(self) -> bool {
        matches!(
            self,
            Self::ProtocolVersionResult
                | Self::ConnectResult
                | Self::TileQueryResult
                | Self::TileUpdateResult
        )
    }

    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProtocolVersion => "PROTOCOL_VERSION",
            Self::ProtocolVersionResult => "PROTOCOL_VERSION_RESULT",
            Self::Connect => "CONNECT",
            Self::ConnectResult => "CONNECT_RESULT",
            Self::TileQuery => "TILE_QUERY",
            Self::TileQueryResult => "TILE_QUERY_RESULT",
            Self::TileUpdate => "TILE_UPDATE",
            Self::TileUpdateResult => "TILE_UPDATE_RESULT",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One framed unit of protocol communication.
///
/// # Example
///
/// ```rust
/// use frog_types::{Message, MessageKind, VersionHandshake};
///
/// let hello = Message::with_payload(
///     MessageKind::ProtocolVersion,
///     &VersionHandshake { version: "v0.0.0.1".to_string() },
/// ).unwrap();
/// assert_eq!(hello.kind(), MessageKind::ProtocolVersion);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    #[serde(rename = "payload")]
    raw_payload: String,
}

impl Message {
    /// Builds a message around an already-encoded payload.
    pub fn new(kind: MessageKind, raw_payload: impl Into<String>) -> Self {
        Self {
            kind,
            raw_payload: raw_payload.into(),
        }
    }

    /// Builds a message whose payload is the JSON encoding of `payload`.
    pub fn with_payload<T: Serialize>(kind: MessageKind, payload: &T) -> Result<Self, CodecError> {
        let raw_payload = serde_json::to_string(payload).map_err(CodecError::Payload)?;
        Ok(Self::new(kind, raw_payload))
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    /// Interprets the raw payload as JSON of type `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        serde_json::from_str(&self.raw_payload).map_err(CodecError::Payload)
    }
}

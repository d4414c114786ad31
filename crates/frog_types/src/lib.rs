//! # Frog Types
//!
//! Shared vocabulary of the Frog client/server protocol.
//!
//! * [`Message`] - the immutable `{kind, payload}` envelope written one per line
//! * [`MessageCodec`] - pluggable line encoding, with [`JsonCodec`] as the default
//! * [`LineReader`] - newline framing with a bound on line length
//! * [`Request`] / [`RequestResult`] - the server-side unit of work and its outcome
//! * typed payloads for the version handshake, authentication and tile access
//!
//! The payload carried by a [`Message`] is an opaque string; the typed payload
//! structs in [`payloads`] are only one interpretation of it.

pub mod codec;
pub mod framing;
pub mod message;
pub mod payloads;
pub mod request;

pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use framing::{LineEvent, LineReader, DEFAULT_MAX_LINE_BYTES};
pub use message::{Message, MessageKind};
pub use payloads::{
    ConnectRequest, ConnectResult, TileQuery, TileQueryResult, TileUpdate, TileUpdateResult,
    VersionHandshake, VersionHandshakeResult,
};
pub use request::{Request, RequestError, RequestId, RequestKind, RequestResult, ResultStatus};

/// Protocol version spoken by this build of the client and server.
pub const PROTOCOL_VERSION: &str = "v0.0.0.1";


//! Client error types.

use frog_types::{CodecError, MessageKind};
use std::io;
use thiserror::Error;

/// Errors returned by [`Connection`](crate::Connection) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Every dial attempt failed.
    #[error("Could not reach {address} after {attempts} attempt(s): {source}")]
    Connectivity {
        address: String,
        attempts: u32,
        source: io::Error,
    },
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Not connected")]
    NotConnected,
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Handshake failures. None of these are retried.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Protocol version {local} rejected by server (server expects {remote})")]
    VersionMismatch { local: String, remote: String },
    #[error("Connection lost during handshake: {0}")]
    HandshakeInterrupted(io::Error),
    #[error("Expected a handshake result, received {0}")]
    UnexpectedMessage(MessageKind),
    #[error("Malformed handshake response: {0}")]
    Malformed(CodecError),
    #[error("Handshake response of {bytes} bytes exceeds the {limit}-byte line limit")]
    OversizedResponse { bytes: usize, limit: usize },
}

/// Failure reported by a single subscriber during packet delivery.
#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("Subscriber is no longer listening")]
    Disconnected,
    #[error("Subscriber rejected packet: {0}")]
    Rejected(String),
}

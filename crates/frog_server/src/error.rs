//! Server error types.

use frog_map::MapError;
use frog_types::CodecError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the handler bootstrap step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("Unknown handler '{0}'")]
    UnknownHandler(String),
    #[error("A handler for '{0}' is already loaded")]
    AlreadyLoaded(String),
}

/// Failure of a single request handler. Turned into a failure result, never
/// propagated further.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("World error: {0}")]
    World(#[from] MapError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Request queue is closed")]
    Closed,
}

/// Failure to deliver a result back to its client.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Client is not reading; {0} replies already pending")]
    Backlog(usize),
    #[error("Reply writer has stopped")]
    Closed,
}

use super::RequestHandler;
use crate::error::HandlerError;
use frog_types::{Request, RequestKind, VersionHandshake, VersionHandshakeResult};
use serde_json::Value;
use tracing::{debug, warn};

/// Answers the version handshake.
pub struct VersionHandler {
    expected: String,
}

impl VersionHandler {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl RequestHandler for VersionHandler {
    fn name(&self) -> &'static str {
        "protocol_version"
    }

    fn kind(&self) -> RequestKind {
        RequestKind::ProtocolVersion
    }

    fn handle(&self, request: &Request) -> Result<Value, HandlerError> {
        let handshake: VersionHandshake = request.args_as()?;
        let result = handshake.version == self.expected;
        if result {
            debug!("Client speaks protocol {}", handshake.version);
        } else {
            warn!("Client protocol {} rejected, expected {}", handshake.version, self.expected);
        }

        Ok(serde_json::to_value(VersionHandshakeResult {
            result,
            expected: Some(self.expected.clone()),
        })?)
    }
}

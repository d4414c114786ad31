//! Typed payloads carried inside [`crate::Message`].
//!
//! Every server reply payload has a boolean `result` field so that a client
//! can tell success from failure without knowing the request in detail.

use serde::{Deserialize, Serialize};

/// Sent by the client immediately after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHandshake {
    pub version: String,
}

/// Server verdict on a [`VersionHandshake`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHandshakeResult {
    pub result: bool,
    /// Version the server accepts, reported so the client can log it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

/// Authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub account: String,
    pub password: String,
}

/// Authentication outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    pub result: bool,
    /// Session token, present only when `result` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConnectResult {
    pub fn accepted(token: String) -> Self {
        Self {
            result: true,
            token: Some(token),
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            result: false,
            token: None,
            reason: Some(reason.into()),
        }
    }
}

/// Read one tile at absolute tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileQuery {
    pub layer: usize,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileQueryResult {
    pub result: bool,
    /// `None` when the tile has never been set (or was cleared)
    pub value: Option<i32>,
}

/// Write a tile; a `None` value clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUpdate {
    pub layer: usize,
    pub x: u32,
    pub y: u32,
    pub value: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUpdateResult {
    pub result: bool,
    /// Value held by the tile before the update
    #[serde(default)]
    pub previous: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_connect_has_no_token() {
        let json = serde_json::to_value(ConnectResult::rejected("bad password")).unwrap();
        assert_eq!(json["result"], false);
        assert!(json.get("token").is_none());
        assert_eq!(json["reason"], "bad password");
    }

    #[test]
    fn test_handshake_result_without_expected_field() {
        let parsed: VersionHandshakeResult = serde_json::from_str(r#"{"result":true}"#).unwrap();
        assert!(parsed.result);
        assert!(parsed.expected.is_none());
    }

    #[test]
    fn test_tile_update_clear() {
        let parsed: TileUpdate =
            serde_json::from_str(r#"{"layer":0,"x":3,"y":4,"value":null}"#).unwrap();
        assert_eq!(parsed.value, None);
        assert_eq!((parsed.x, parsed.y), (3, 4));
    }
}

//! Line codecs for [`Message`].
//!
//! The transport frames exactly one encoded message per line, so every codec
//! must produce output without a raw newline. [`JsonCodec`] encodes the
//! envelope as a JSON object, e.g.
//! `{"kind":"CONNECT_RESULT","payload":"{\"result\":true,\"token\":\"...\"}"}`.

use crate::message::Message;
use thiserror::Error;

/// Errors raised while encoding or decoding messages and payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode message: {0}")]
    Encode(serde_json::Error),
    #[error("Failed to decode message: {0}")]
    Decode(serde_json::Error),
    #[error("Invalid message payload: {0}")]
    Payload(serde_json::Error),
    #[error("Encoded message contains a line break")]
    EmbeddedNewline,
}

/// Converts messages to and from single lines of text.
pub trait MessageCodec: Send + Sync {
    /// Encodes a message into one line, without the trailing newline.
    fn encode(&self, message: &Message) -> Result<String, CodecError>;

    /// Decodes one line (without its trailing newline) into a message.
    fn decode(&self, line: &str) -> Result<Message, CodecError>;
}

/// Default codec: the message envelope as a compact JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<String, CodecError> {
        let line = serde_json::to_string(message).map_err(CodecError::Encode)?;
        if line.contains('\n') {
            return Err(CodecError::EmbeddedNewline);
        }
        Ok(line)
    }

    fn decode(&self, line: &str) -> Result<Message, CodecError> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n'])).map_err(CodecError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[test]
    fn test_encoded_message_is_single_line() {
        let message = Message::new(MessageKind::Connect, "multi\nline\npayload");
        let line = JsonCodec.encode(&message).unwrap();

        assert!(!line.contains('\n'));
        assert_eq!(JsonCodec.decode(&line).unwrap(), message);
    }

    #[test]
    fn test_wire_shape() {
        let line = JsonCodec
            .encode(&Message::new(MessageKind::ProtocolVersion, "{}"))
            .unwrap();
        assert_eq!(line, r#"{"kind":"PROTOCOL_VERSION","payload":"{}"}"#);
    }

    #[test]
    fn test_decode_tolerates_crlf() {
        let message = JsonCodec
            .decode("{\"kind\":\"CONNECT\",\"payload\":\"x\"}\r\n")
            .unwrap();
        assert_eq!(message.kind(), MessageKind::Connect);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(JsonCodec.decode("1"), Err(CodecError::Decode(_))));
        assert!(matches!(
            JsonCodec.decode(r#"{"kind":"NOPE","payload":""}"#),
            Err(CodecError::Decode(_))
        ));
    }
}

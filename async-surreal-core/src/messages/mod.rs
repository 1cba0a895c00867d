// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The RPC envelope: requests going out, responses and notifications
//! coming in, over either wire encoding.

mod request;
mod response;

pub use request::{methods, Request};
pub use response::{Action, Notification, Response, ServerMessage};

use surreal_types::{Error, Result, Value};

/// The on-wire payload encoding, selected once at construction. Content
/// negotiation is static, never per-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// JSON text frames.
    #[default]
    Text,
    /// CBOR binary frames.
    Binary,
}

impl PayloadFormat {
    /// Encode a wire value with this format.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match self {
            PayloadFormat::Text => surreal_types::text::serialize_text(value),
            PayloadFormat::Binary => surreal_types::binary::serialize_binary(value),
        }
    }

    /// Decode a payload in this format into a wire value.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        match self {
            PayloadFormat::Text => surreal_types::text::parse_text(bytes),
            PayloadFormat::Binary => surreal_types::binary::parse_binary(bytes),
        }
    }

    /// The HTTP content type for payloads in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            PayloadFormat::Text => "application/json",
            PayloadFormat::Binary => "application/cbor",
        }
    }

    /// True when frames in this format are sent as binary WebSocket
    /// messages rather than text ones.
    pub fn is_binary(&self) -> bool {
        matches!(self, PayloadFormat::Binary)
    }
}

/// Decode one inbound frame into a response or a notification.
///
/// Anything that is neither decodes to an error; the transport logs and
/// skips such frames rather than tearing down the connection.
pub fn decode_message(bytes: &[u8], format: PayloadFormat) -> Result<ServerMessage> {
    let value = format.decode(bytes)?;
    let Value::Object(map) = value else {
        return Err(Error::InvalidResponse(format!(
            "expected an envelope object, got {}",
            value.kind()
        )));
    };
    ServerMessage::from_envelope(map)
}

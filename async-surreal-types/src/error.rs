// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Client error taxonomy. Variant messages are diagnostic strings, not a
//! machine interface; match on the variant, not the text.

use thiserror::Error;

use crate::Value;

/// An error object returned by the server inside a response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// Numeric error code, surfaced verbatim from the server.
    pub code: i64,
    /// Human readable message from the server.
    pub message: String,
    /// Optional structured payload attached to the error.
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Errors produced by the client.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport could not be established, or failed at the protocol
    /// level (TCP reset, non-2xx HTTP status, malformed URL).
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection dropped while a request was awaiting its response.
    /// The request may or may not have reached the server.
    #[error("connection closed while a request was in flight")]
    TransportClosed,

    /// An operation was issued before `connect()`.
    #[error("not connected, call connect() first")]
    NotConnected,

    /// The per-request timeout expired before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an error envelope.
    #[error("rpc error: {0}")]
    Rpc(RpcError),

    /// An authentication method returned a result of the wrong shape.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The envelope decoded, but its content violates the protocol
    /// contract. Treat as a server-side bug.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A record identifier failed to parse or validate.
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    /// A query string failed pre-send validation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An identifier, field or keyword failed validation before being
    /// composed into query text. Never sent to the server.
    #[error("validation error: {0}")]
    Validation(String),

    /// User data could not become a wire value, or a decode mismatched
    /// the expected shape.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The operation requires a capability the chosen transport does not
    /// have, e.g. live queries over the stateless transport.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl Error {
    /// Shorthand for an [`Error::Encoding`] with formatted context.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Error::Encoding(msg.into())
    }

    /// Shorthand for an [`Error::Connection`] with formatted context.
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// True if this error was produced by the server rather than the
    /// client or the transport.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Rpc(_) | Error::InvalidResponse(_))
    }
}

impl From<RpcError> for Error {
    fn from(value: RpcError) -> Self {
        Error::Rpc(value)
    }
}

impl serde::ser::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::Encoding(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::Encoding(msg.to_string())
    }
}

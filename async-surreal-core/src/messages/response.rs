// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

use std::str::FromStr;

use surreal_types::{Error, Object, Result, RpcError, Value};

/// One inbound frame, after envelope decoding.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// An answer to a request, matched by id.
    Response(Response),
    /// A server-initiated live query notification.
    Notification(Notification),
}

/// A response envelope: the request id plus exactly one of result or
/// error.
#[derive(Debug, Clone)]
pub struct Response {
    /// Echo of the request id. Live notifications arrive without one.
    pub id: Option<String>,
    /// The outcome, with server errors surfaced verbatim.
    pub result: std::result::Result<Value, RpcError>,
}

/// The change kind carried by a live query notification. Case is
/// normalized on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A record was created.
    Create,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
    /// The subscription was closed by the server.
    Close,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("create") {
            Ok(Action::Create)
        } else if s.eq_ignore_ascii_case("update") {
            Ok(Action::Update)
        } else if s.eq_ignore_ascii_case("delete") {
            Ok(Action::Delete)
        } else if s.eq_ignore_ascii_case("close") {
            Ok(Action::Close)
        } else {
            Err(Error::InvalidResponse(format!(
                "unknown notification action `{s}`"
            )))
        }
    }
}

/// A live query notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The subscription this change belongs to.
    pub subscription_id: String,
    /// What happened.
    pub action: Action,
    /// The affected value, or a diff when the subscription asked for one.
    pub data: Value,
}

impl ServerMessage {
    /// Classify a decoded envelope object.
    ///
    /// A frame with an `id` key is a response; otherwise it must parse as
    /// a notification, either at the top level or wrapped in a `result`
    /// object (the envelope shape differs across server versions).
    pub(crate) fn from_envelope(mut map: Object) -> Result<Self> {
        if map.contains_key("id") && !map.contains_key("action") {
            return Ok(ServerMessage::Response(parse_response(map)?));
        }
        if map.contains_key("action") {
            return Ok(ServerMessage::Notification(parse_notification(map)?));
        }
        if let Some(Value::Object(inner)) = map.remove("result") {
            if inner.contains_key("action") {
                return Ok(ServerMessage::Notification(parse_notification(inner)?));
            }
        }
        Err(Error::InvalidResponse(
            "frame is neither a response nor a notification".to_string(),
        ))
    }
}

fn parse_response(mut map: Object) -> Result<Response> {
    let id = match map.remove("id") {
        Some(Value::Strand(s)) => Some(s),
        Some(Value::None) | None => None,
        Some(other) => {
            return Err(Error::InvalidResponse(format!(
                "response id must be a string, got {}",
                other.kind()
            )))
        }
    };
    let result = map.remove("result");
    let error = map.remove("error");
    match (result, error) {
        (Some(value), None) => Ok(Response {
            id,
            result: Ok(value),
        }),
        (None, Some(error)) => Ok(Response {
            id,
            result: Err(parse_error(error)?),
        }),
        (Some(_), Some(_)) => Err(Error::InvalidResponse(
            "response carries both result and error".to_string(),
        )),
        (None, None) => Err(Error::InvalidResponse(
            "response carries neither result nor error".to_string(),
        )),
    }
}

fn parse_error(value: Value) -> Result<RpcError> {
    let Value::Object(mut map) = value else {
        return Err(Error::InvalidResponse(format!(
            "error payload must be an object, got {}",
            value.kind()
        )));
    };
    let code = match map.remove("code") {
        Some(Value::Int(code)) => code,
        other => {
            return Err(Error::InvalidResponse(format!(
                "error code must be an integer, got {:?}",
                other.map(|v| v.kind())
            )))
        }
    };
    let message = match map.remove("message") {
        Some(Value::Strand(msg)) => msg,
        other => {
            return Err(Error::InvalidResponse(format!(
                "error message must be a string, got {:?}",
                other.map(|v| v.kind())
            )))
        }
    };
    Ok(RpcError {
        code,
        message,
        data: map.remove("data"),
    })
}

fn parse_notification(mut map: Object) -> Result<Notification> {
    let action = match map.remove("action") {
        Some(Value::Strand(s)) => s.parse::<Action>()?,
        other => {
            return Err(Error::InvalidResponse(format!(
                "notification action must be a string, got {:?}",
                other.map(|v| v.kind())
            )))
        }
    };
    let subscription_id = match map.remove("id") {
        Some(Value::Strand(s)) => s,
        other => {
            return Err(Error::InvalidResponse(format!(
                "notification id must be a string, got {:?}",
                other.map(|v| v.kind())
            )))
        }
    };
    let data = map.remove("result").unwrap_or(Value::None);
    Ok(Notification {
        subscription_id,
        action,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_normalize_case() {
        assert_eq!("CREATE".parse::<Action>().unwrap(), Action::Create);
        assert_eq!("create".parse::<Action>().unwrap(), Action::Create);
        assert_eq!("Close".parse::<Action>().unwrap(), Action::Close);
        assert!("destroy".parse::<Action>().is_err());
    }
}

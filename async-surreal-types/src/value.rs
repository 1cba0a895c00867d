// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The wire value: a tagged union bridging user records and the RPC
//! payload.

use std::collections::BTreeMap;
use std::fmt;

use crate::RecordId;

/// The object variant of a [`Value`].
///
/// A `BTreeMap` rather than a hash map: insertion order is irrelevant on
/// the wire, and sorted keys give the canonical encoding the client cache
/// relies on when hashing parameter lists.
pub type Object = BTreeMap<String, Value>;

/// A wire value.
///
/// Every request parameter and every decoded result passes through this
/// type. It is encodable to both the text (JSON) and binary (CBOR) wire
/// formats, see [`crate::text`] and [`crate::binary`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null value.
    #[default]
    None,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer. Integers outside this range fail encoding,
    /// they are never truncated.
    Int(i64),
    /// IEEE-754 double.
    Float(f64),
    /// UTF-8 string.
    Strand(String),
    /// Byte sequence. Serializes to a distinguished form in the text
    /// encoding, not a plain string.
    Bytes(Vec<u8>),
    /// Ordered array of values.
    Array(Vec<Value>),
    /// String-keyed mapping. Insertion order is irrelevant.
    Object(Object),
    /// A record identifier, `table:id`.
    RecordId(RecordId),
}

impl Value {
    /// Name of the variant, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Strand(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::RecordId(_) => "record id",
        }
    }

    /// True for `Value::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Borrow the string content, if this is a strand.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Strand(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow the object content, if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow the array content, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Consume into the array content, if this is an array.
    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the record id, if this is one.
    pub fn as_record_id(&self) -> Option<&RecordId> {
        match self {
            Value::RecordId(r) => Some(r),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Strand(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Strand(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<RecordId> for Value {
    fn from(value: RecordId) -> Self {
        Value::RecordId(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "NONE"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Strand(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<bytes:{}>", b.len()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{ ")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, " }}")
            }
            Value::RecordId(rid) => write!(f, "{rid}"),
        }
    }
}

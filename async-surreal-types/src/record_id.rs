// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Record identifiers: a `(table, id)` pair with a `table:id` textual
//! form.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::ident::{escape_ident, is_bare_ident};
use crate::value::Object;
use crate::{Error, Result, Value};

/// Private serde marker so record ids survive the serde bridge without
/// collapsing into plain maps. See `ser`/`de` in this crate.
pub(crate) const TOKEN_RECORD_ID: &str = "$surreal::private::RecordId";

/// The id half of a record identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordIdKey {
    /// Numeric id, e.g. `person:42`.
    Int(i64),
    /// String id, bare or escaped in the textual form.
    String(String),
    /// Structured array id, e.g. `range:[2024, 1]`.
    Array(Vec<Value>),
    /// Structured object id, e.g. `weather:{ city: "london" }`.
    Object(Object),
}

impl RecordIdKey {
    /// The key as a wire value.
    pub fn to_value(&self) -> Value {
        match self {
            RecordIdKey::Int(i) => Value::Int(*i),
            RecordIdKey::String(s) => Value::Strand(s.clone()),
            RecordIdKey::Array(a) => Value::Array(a.clone()),
            RecordIdKey::Object(o) => Value::Object(o.clone()),
        }
    }

    /// Build a key from a wire value, rejecting shapes the id grammar
    /// does not allow.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(RecordIdKey::Int(i)),
            Value::Strand(s) => Ok(RecordIdKey::String(s)),
            Value::Array(a) => Ok(RecordIdKey::Array(a)),
            Value::Object(o) => Ok(RecordIdKey::Object(o)),
            other => Err(Error::InvalidRecordId(format!(
                "record id must be a scalar, object or array, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<i64> for RecordIdKey {
    fn from(value: i64) -> Self {
        RecordIdKey::Int(value)
    }
}

impl From<&str> for RecordIdKey {
    fn from(value: &str) -> Self {
        RecordIdKey::String(value.to_string())
    }
}

impl From<String> for RecordIdKey {
    fn from(value: String) -> Self {
        RecordIdKey::String(value)
    }
}

impl fmt::Display for RecordIdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIdKey::Int(i) => write!(f, "{i}"),
            RecordIdKey::String(s) => {
                if is_bare_ident(s) {
                    write!(f, "{s}")
                } else {
                    let mut out = String::with_capacity(s.len() + 2);
                    out.push('`');
                    for c in s.chars() {
                        if c == '`' || c == '\\' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push('`');
                    write!(f, "{out}")
                }
            }
            RecordIdKey::Array(_) | RecordIdKey::Object(_) => {
                let text = crate::text::serialize_text(&self.to_value())
                    .map_err(|_| fmt::Error)?;
                write!(f, "{}", String::from_utf8_lossy(&text))
            }
        }
    }
}

/// A record identifier: a table name and an id within that table.
///
/// The textual form is `table:id` where the id is a bare identifier, an
/// integer, a backtick-escaped string, or a structured (JSON) literal.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordId {
    table: String,
    key: RecordIdKey,
}

impl RecordId {
    /// Create a record id. The table must be a non-empty identifier,
    /// either bare or backtick-quoted; a quoted table is stored unquoted.
    pub fn new(table: impl Into<String>, key: impl Into<RecordIdKey>) -> Result<Self> {
        let table = table.into();
        crate::ident::validate_table_name(&table)?;
        let table = if table.starts_with('`') {
            parse_quoted(&table)?.0
        } else {
            table
        };
        Ok(Self {
            table,
            key: key.into(),
        })
    }

    /// The table this record belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The id within the table.
    pub fn key(&self) -> &RecordIdKey {
        &self.key
    }

    pub(crate) fn from_parts_unchecked(table: String, key: RecordIdKey) -> Self {
        Self { table, key }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", escape_ident(&self.table), self.key)
    }
}

/// Take one backtick-quoted segment off the front of `s`, returning the
/// unescaped body and the rest.
fn parse_quoted(s: &str) -> Result<(String, &str)> {
    debug_assert!(s.starts_with('`'));
    let mut body = String::new();
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            body.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '`' {
            return Ok((body, &s[i + c.len_utf8()..]));
        } else {
            body.push(c);
        }
    }
    Err(Error::InvalidRecordId(format!(
        "unterminated backtick escape in `{s}`"
    )))
}

fn parse_key(s: &str) -> Result<RecordIdKey> {
    if s.is_empty() {
        return Err(Error::InvalidRecordId("empty id segment".into()));
    }
    if let Ok(i) = s.parse::<i64>() {
        return Ok(RecordIdKey::Int(i));
    }
    if is_bare_ident(s) {
        return Ok(RecordIdKey::String(s.to_string()));
    }
    if s.starts_with('`') {
        let (body, rest) = parse_quoted(s)?;
        if !rest.is_empty() {
            return Err(Error::InvalidRecordId(format!(
                "trailing characters after escaped id in `{s}`"
            )));
        }
        if body.is_empty() {
            return Err(Error::InvalidRecordId("empty id segment".into()));
        }
        return Ok(RecordIdKey::String(body));
    }
    if s.starts_with('[') || s.starts_with('{') {
        let value = crate::text::parse_text(s.as_bytes())
            .map_err(|e| Error::InvalidRecordId(format!("invalid structured id `{s}`: {e}")))?;
        return RecordIdKey::from_value(value);
    }
    Err(Error::InvalidRecordId(format!(
        "`{s}` is not a valid record id segment"
    )))
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (table, rest) = if s.starts_with('`') {
            let (table, rest) = parse_quoted(s)?;
            let rest = rest.strip_prefix(':').ok_or_else(|| {
                Error::InvalidRecordId(format!("expected `:` after table name in `{s}`"))
            })?;
            (table, rest)
        } else {
            let (table, rest) = s.split_once(':').ok_or_else(|| {
                Error::InvalidRecordId(format!("`{s}` is missing the `:` separator"))
            })?;
            (table.to_string(), rest)
        };
        if table.is_empty() {
            return Err(Error::InvalidRecordId("empty table segment".into()));
        }
        if !s.starts_with('`') && !is_bare_ident(&table) {
            return Err(Error::InvalidRecordId(format!(
                "`{table}` is not a valid table name"
            )));
        }
        let key = parse_key(rest)?;
        Ok(RecordId { table, key })
    }
}

impl TryFrom<&str> for RecordId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        struct Inner<'a>(&'a RecordId);

        impl Serialize for Inner<'_> {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tb", self.0.table())?;
                map.serialize_entry("id", &self.0.key().to_value())?;
                map.end()
            }
        }

        serializer.serialize_newtype_struct(TOKEN_RECORD_ID, &Inner(self))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RecordIdVisitor;

        impl<'de> serde::de::Visitor<'de> for RecordIdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a record id string or a { tb, id } map")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(serde::de::Error::custom)
            }

            fn visit_newtype_struct<D>(
                self,
                deserializer: D,
            ) -> std::result::Result<Self::Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut table: Option<String> = None;
                let mut id: Option<Value> = None;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "tb" => table = Some(map.next_value()?),
                        "id" => id = Some(map.next_value()?),
                        other => {
                            return Err(serde::de::Error::unknown_field(other, &["tb", "id"]))
                        }
                    }
                }
                let table =
                    table.ok_or_else(|| serde::de::Error::missing_field("tb"))?;
                let id = id.ok_or_else(|| serde::de::Error::missing_field("id"))?;
                let key = RecordIdKey::from_value(id).map_err(serde::de::Error::custom)?;
                Ok(RecordId { table, key })
            }
        }

        deserializer.deserialize_newtype_struct(TOKEN_RECORD_ID, RecordIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare() {
        let rid: RecordId = "users:alice".parse().unwrap();
        assert_eq!(rid.table(), "users");
        assert_eq!(rid.key(), &RecordIdKey::String("alice".into()));
        assert_eq!(rid.to_string(), "users:alice");
    }

    #[test]
    fn parse_numeric() {
        let rid: RecordId = "person:42".parse().unwrap();
        assert_eq!(rid.key(), &RecordIdKey::Int(42));
        assert_eq!(rid.to_string(), "person:42");
    }

    #[test]
    fn parse_escaped() {
        let rid: RecordId = "users:`alice smith`".parse().unwrap();
        assert_eq!(rid.key(), &RecordIdKey::String("alice smith".into()));
        assert_eq!(rid.to_string(), "users:`alice smith`");
    }

    #[test]
    fn numeric_looking_strings_stay_escaped() {
        let rid = RecordId::new("users", "123").unwrap();
        let text = rid.to_string();
        assert_eq!(text, "users:`123`");
        let back: RecordId = text.parse().unwrap();
        assert_eq!(back.key(), &RecordIdKey::String("123".into()));
    }

    #[test]
    fn parse_structured() {
        let rid: RecordId = "range:[2024, 1]".parse().unwrap();
        assert_eq!(
            rid.key(),
            &RecordIdKey::Array(vec![Value::Int(2024), Value::Int(1)])
        );
    }

    #[test]
    fn rejects_empty_segments() {
        assert!("".parse::<RecordId>().is_err());
        assert!("users:".parse::<RecordId>().is_err());
        assert!(":alice".parse::<RecordId>().is_err());
        assert!("users".parse::<RecordId>().is_err());
    }

    #[test]
    fn rejects_invalid_table() {
        assert!("has space:alice".parse::<RecordId>().is_err());
        assert!(RecordId::new("", "x").is_err());
    }

    #[test]
    fn quoted_table_roundtrip() {
        let rid: RecordId = "`odd table`:x".parse().unwrap();
        assert_eq!(rid.table(), "odd table");
        let text = rid.to_string();
        let back: RecordId = text.parse().unwrap();
        assert_eq!(back, rid);
    }
}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The binary wire format: CBOR, with a semantic tag for record ids.
//!
//! Unlike the text encoding, CBOR carries byte strings and non-finite
//! floats natively, so only record ids need a tag.

use ciborium::value::Value as Cbor;
use log::debug;

use crate::record_id::{RecordId, RecordIdKey};
use crate::value::Object;
use crate::{Error, Result, Value};

/// Semantic tag for a record id: an array of `[table, id]`.
const TAG_RECORD_ID: u64 = 8;

/// Serialize a wire value to the binary encoding.
pub fn serialize_binary(value: &Value) -> Result<Vec<u8>> {
    let cbor = to_cbor(value);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&cbor, &mut out)
        .map_err(|e| Error::encoding(format!("cbor serialization: {e}")))?;
    Ok(out)
}

/// Parse the binary encoding into a wire value.
pub fn parse_binary(bytes: &[u8]) -> Result<Value> {
    let cbor: Cbor = ciborium::de::from_reader(bytes)
        .map_err(|e| Error::encoding(format!("invalid cbor: {e}")))?;
    from_cbor(cbor)
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::None => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Int(i) => Cbor::Integer((*i).into()),
        Value::Float(v) => Cbor::Float(*v),
        Value::Strand(s) => Cbor::Text(s.clone()),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Object(map) => Cbor::Map(
            map.iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), to_cbor(v)))
                .collect(),
        ),
        Value::RecordId(rid) => Cbor::Tag(
            TAG_RECORD_ID,
            Box::new(Cbor::Array(vec![
                Cbor::Text(rid.table().to_string()),
                to_cbor(&rid.key().to_value()),
            ])),
        ),
    }
}

fn from_cbor(cbor: Cbor) -> Result<Value> {
    Ok(match cbor {
        Cbor::Null => Value::None,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(i) => {
            let i = i128::from(i);
            let i = i64::try_from(i).map_err(|_| {
                Error::encoding(format!("integer {i} out of range for the wire value"))
            })?;
            Value::Int(i)
        }
        Cbor::Float(v) => Value::Float(v),
        Cbor::Text(s) => Value::Strand(s),
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_cbor)
                .collect::<Result<Vec<_>>>()?,
        ),
        Cbor::Map(entries) => {
            let mut out = Object::new();
            for (k, v) in entries {
                let Cbor::Text(key) = k else {
                    return Err(Error::encoding("cbor map keys must be text"));
                };
                out.insert(key, from_cbor(v)?);
            }
            Value::Object(out)
        }
        Cbor::Tag(TAG_RECORD_ID, inner) => {
            let Cbor::Array(mut parts) = *inner else {
                return Err(Error::encoding("record id tag must wrap an array"));
            };
            if parts.len() != 2 {
                return Err(Error::encoding("record id tag must wrap [table, id]"));
            }
            let id = parts.pop().expect("len checked");
            let table = parts.pop().expect("len checked");
            let Cbor::Text(table) = table else {
                return Err(Error::encoding("record id table must be text"));
            };
            if table.is_empty() {
                return Err(Error::encoding("record id table must not be empty"));
            }
            let key = RecordIdKey::from_value(from_cbor(id)?)
                .map_err(|e| Error::encoding(format!("invalid record id: {e}")))?;
            Value::RecordId(RecordId::from_parts_unchecked(table, key))
        }
        Cbor::Tag(tag, inner) => {
            debug!("ignoring unknown cbor tag {tag}");
            from_cbor(*inner)?
        }
        other => {
            return Err(Error::encoding(format!(
                "unsupported cbor item: {other:?}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value) {
        let bytes = serialize_binary(&value).unwrap();
        let back = parse_binary(&bytes).unwrap();
        assert_eq!(back, value, "binary roundtrip failed for {value}");
    }

    #[test]
    fn scalars_roundtrip() {
        roundtrip(Value::None);
        roundtrip(Value::Bool(false));
        roundtrip(Value::Int(i64::MIN));
        roundtrip(Value::Int(i64::MAX));
        roundtrip(Value::Float(-0.5));
        roundtrip(Value::Strand("héllo".into()));
        roundtrip(Value::Bytes(vec![0, 1, 255]));
    }

    #[test]
    fn non_finite_floats_roundtrip() {
        roundtrip(Value::Float(f64::INFINITY));
        roundtrip(Value::Float(f64::NEG_INFINITY));

        let bytes = serialize_binary(&Value::Float(f64::NAN)).unwrap();
        let Value::Float(v) = parse_binary(&bytes).unwrap() else {
            panic!("expected a float");
        };
        assert!(v.is_nan());
    }

    #[test]
    fn containers_roundtrip() {
        let mut obj = Object::new();
        obj.insert("a".into(), Value::Array(vec![Value::Int(1)]));
        obj.insert("rid".into(), Value::RecordId(RecordId::new("t", 9i64).unwrap()));
        roundtrip(Value::Object(obj));
    }

    #[test]
    fn record_id_uses_the_semantic_tag() {
        let bytes =
            serialize_binary(&Value::RecordId(RecordId::new("users", "a").unwrap())).unwrap();
        let raw: Cbor = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert!(matches!(raw, Cbor::Tag(TAG_RECORD_ID, _)));
    }

    #[test]
    fn out_of_range_integers_fail_on_parse() {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&Cbor::Integer(u64::MAX.into()), &mut out).unwrap();
        assert!(parse_binary(&out).is_err());
    }

    #[test]
    fn unknown_tags_unwrap_to_their_content() {
        let mut out = Vec::new();
        let tagged = Cbor::Tag(999, Box::new(Cbor::Text("x".into())));
        ciborium::ser::into_writer(&tagged, &mut out).unwrap();
        assert_eq!(parse_binary(&out).unwrap(), Value::Strand("x".into()));
    }
}

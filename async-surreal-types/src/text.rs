// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The text wire format: JSON, with tagged object forms for the two
//! variants JSON cannot carry natively.
//!
//! Byte sequences become `{"$bytes": "<base64>"}` and record ids become
//! `{"$record": {"tb": ..., "id": ...}}`. Plain objects that would collide
//! with a tagged form are rejected on encode, so the mapping stays
//! unambiguous in both directions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::record_id::{RecordId, RecordIdKey};
use crate::value::Object;
use crate::{Error, Result, Value};

const BYTES_TAG: &str = "$bytes";
const RECORD_TAG: &str = "$record";

/// Serialize a wire value to the text encoding.
///
/// Fails on `NaN` and infinities, which JSON cannot represent, and on
/// objects whose shape would collide with a tagged form.
pub fn serialize_text(value: &Value) -> Result<Vec<u8>> {
    let json = to_json(value)?;
    serde_json::to_vec(&json).map_err(|e| Error::encoding(format!("json serialization: {e}")))
}

/// Parse the text encoding into a wire value.
pub fn parse_text(bytes: &[u8]) -> Result<Value> {
    let json: Json = serde_json::from_slice(bytes)
        .map_err(|e| Error::encoding(format!("invalid json: {e}")))?;
    from_json(json)
}

fn to_json(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(v) => {
            let n = Number::from_f64(*v).ok_or_else(|| {
                Error::encoding(format!("{v} is not representable in the text encoding"))
            })?;
            Json::Number(n)
        }
        Value::Strand(s) => Json::String(s.clone()),
        Value::Bytes(b) => {
            let mut map = JsonMap::with_capacity(1);
            map.insert(BYTES_TAG.to_string(), Json::String(BASE64.encode(b)));
            Json::Object(map)
        }
        Value::Array(items) => {
            Json::Array(items.iter().map(to_json).collect::<Result<Vec<_>>>()?)
        }
        Value::Object(map) => {
            if map.len() == 1 && (map.contains_key(BYTES_TAG) || map.contains_key(RECORD_TAG)) {
                return Err(Error::encoding(format!(
                    "object shape collides with the `{}` tagged form",
                    map.keys().next().expect("len checked")
                )));
            }
            let mut out = JsonMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), to_json(v)?);
            }
            Json::Object(out)
        }
        Value::RecordId(rid) => {
            let mut inner = JsonMap::with_capacity(2);
            inner.insert("tb".to_string(), Json::String(rid.table().to_string()));
            inner.insert("id".to_string(), to_json(&rid.key().to_value())?);
            let mut map = JsonMap::with_capacity(1);
            map.insert(RECORD_TAG.to_string(), Json::Object(inner));
            Json::Object(map)
        }
    })
}

fn from_json(json: Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::None,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                if n.is_u64() {
                    return Err(Error::encoding(format!(
                        "integer {n} out of range for the wire value"
                    )));
                }
                Value::Float(f)
            } else {
                return Err(Error::encoding(format!("unrepresentable number {n}")));
            }
        }
        Json::String(s) => Value::Strand(s),
        Json::Array(items) => {
            Value::Array(items.into_iter().map(from_json).collect::<Result<Vec<_>>>()?)
        }
        Json::Object(mut map) => {
            if map.len() == 1 && map.contains_key(BYTES_TAG) {
                let payload = map.remove(BYTES_TAG).expect("key checked");
                let Json::String(encoded) = payload else {
                    return Err(Error::encoding("`$bytes` payload must be a string"));
                };
                let decoded = BASE64
                    .decode(encoded.as_bytes())
                    .map_err(|e| Error::encoding(format!("invalid `$bytes` payload: {e}")))?;
                return Ok(Value::Bytes(decoded));
            }
            if map.len() == 1 && map.contains_key(RECORD_TAG) {
                let payload = map.remove(RECORD_TAG).expect("key checked");
                let Json::Object(mut inner) = payload else {
                    return Err(Error::encoding("`$record` payload must be an object"));
                };
                let (Some(Json::String(table)), Some(id)) =
                    (inner.remove("tb"), inner.remove("id"))
                else {
                    return Err(Error::encoding("`$record` payload must carry `tb` and `id`"));
                };
                if table.is_empty() {
                    return Err(Error::encoding("`$record` table must not be empty"));
                }
                let key = RecordIdKey::from_value(from_json(id)?)
                    .map_err(|e| Error::encoding(format!("invalid `$record` id: {e}")))?;
                return Ok(Value::RecordId(RecordId::from_parts_unchecked(table, key)));
            }
            let mut out = Object::new();
            for (k, v) in map {
                out.insert(k, from_json(v)?);
            }
            Value::Object(out)
        }
    })
}

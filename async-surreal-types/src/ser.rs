// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The encode half of the serde bridge: any `Serialize` type becomes a
//! [`Value`] tree.

use serde::ser::{self, Serialize};

use crate::record_id::{RecordId, RecordIdKey, TOKEN_RECORD_ID};
use crate::value::Object;
use crate::{Error, Result, Value};

/// Encode a user record into a wire value.
///
/// Fails with [`Error::Encoding`] when the type emits a construct the
/// value grammar cannot represent: non-string map keys, or integers
/// outside the signed 64-bit range (these are rejected, never truncated).
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    value.serialize(ValueSerializer)
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Strand(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                use serde::ser::SerializeMap;
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
            Value::RecordId(rid) => rid.serialize(serializer),
        }
    }
}

struct ValueSerializer;

fn int_from_u64(v: u64) -> Result<Value> {
    i64::try_from(v)
        .map(Value::Int)
        .map_err(|_| Error::encoding(format!("integer {v} out of range for the wire value")))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMapImpl;
    type SerializeStruct = SerializeStructImpl;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| Error::encoding(format!("integer {v} out of range for the wire value")))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Int(v as i64))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        int_from_u64(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| Error::encoding(format!("integer {v} out of range for the wire value")))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Float(v as f64))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Strand(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::Strand(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::None)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::Strand(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        if name == TOKEN_RECORD_ID {
            let inner = value.serialize(ValueSerializer)?;
            let Value::Object(mut map) = inner else {
                return Err(Error::encoding("malformed record id payload"));
            };
            let (Some(Value::Strand(table)), Some(id)) = (map.remove("tb"), map.remove("id"))
            else {
                return Err(Error::encoding("malformed record id payload"));
            };
            let key = RecordIdKey::from_value(id)
                .map_err(|e| Error::encoding(format!("malformed record id payload: {e}")))?;
            if table.is_empty() {
                return Err(Error::encoding("record id table must not be empty"));
            }
            return Ok(Value::RecordId(RecordId::from_parts_unchecked(table, key)));
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        let mut map = Object::new();
        map.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeMapImpl {
            map: Object::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(SerializeStructImpl { map: Object::new() })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant,
            map: Object::new(),
        })
    }
}

struct SerializeVec {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let mut map = Object::new();
        map.insert(self.variant.to_string(), Value::Array(self.items));
        Ok(Value::Object(map))
    }
}

struct SerializeMapImpl {
    map: Object,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMapImpl {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        match key.serialize(ValueSerializer)? {
            Value::Strand(s) => {
                self.next_key = Some(s);
                Ok(())
            }
            other => Err(Error::encoding(format!(
                "map keys must be strings, got {}",
                other.kind()
            ))),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::encoding("serialize_value called before serialize_key"))?;
        self.map.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

struct SerializeStructImpl {
    map: Object,
}

impl ser::SerializeStruct for SerializeStructImpl {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.map
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

struct SerializeStructVariant {
    variant: &'static str,
    map: Object,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.map
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let mut map = Object::new();
        map.insert(self.variant.to_string(), Value::Object(self.map));
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct User {
        name: String,
        age: u32,
        tags: Vec<String>,
    }

    #[test]
    fn structs_become_objects() {
        let user = User {
            name: "A".into(),
            age: 30,
            tags: vec!["x".into()],
        };
        let value = to_value(&user).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["name"], Value::Strand("A".into()));
        assert_eq!(obj["age"], Value::Int(30));
        assert_eq!(obj["tags"], Value::Array(vec![Value::Strand("x".into())]));
    }

    #[test]
    fn u64_out_of_range_fails() {
        let err = to_value(&u64::MAX).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(to_value(&(i64::MAX as u64)).is_ok());
    }

    #[test]
    fn non_string_map_keys_fail() {
        let map: std::collections::HashMap<u32, &str> = [(1, "a")].into_iter().collect();
        assert!(matches!(to_value(&map), Err(Error::Encoding(_))));
    }

    #[test]
    fn record_ids_survive_the_bridge() {
        #[derive(Serialize)]
        struct Doc {
            id: RecordId,
        }
        let doc = Doc {
            id: RecordId::new("users", "alice").unwrap(),
        };
        let value = to_value(&doc).unwrap();
        let obj = value.as_object().unwrap();
        assert!(matches!(obj["id"], Value::RecordId(_)));
    }

    #[test]
    fn value_passthrough_is_identity() {
        let mut obj = Object::new();
        obj.insert("b".into(), Value::Bytes(vec![1, 2]));
        obj.insert(
            "r".into(),
            Value::RecordId(RecordId::new("t", 1i64).unwrap()),
        );
        let original = Value::Array(vec![Value::Object(obj), Value::None]);
        assert_eq!(to_value(&original).unwrap(), original);
    }

    #[test]
    fn enums_are_externally_tagged() {
        #[derive(Serialize)]
        enum Shape {
            Point,
            Circle { radius: f64 },
        }
        assert_eq!(to_value(&Shape::Point).unwrap(), Value::Strand("Point".into()));
        let circle = to_value(&Shape::Circle { radius: 1.0 }).unwrap();
        let obj = circle.as_object().unwrap();
        assert!(obj.contains_key("Circle"));
    }
}

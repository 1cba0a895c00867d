// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The decode half of the serde bridge: a [`Value`] tree drives any
//! `Deserialize` type. Shape mismatches carry the path of the offending
//! field, e.g. `expected i64, got string at $.user.age`.

use std::fmt;

use serde::de::{
    self, Deserialize, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer,
    MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::record_id::{RecordId, RecordIdKey, TOKEN_RECORD_ID};
use crate::value::Object;
use crate::{Error, Result, Value};

/// Decode a wire value into a user type.
///
/// Fails with [`Error::Encoding`] when the value's shape does not match
/// what the target type expects; the message names the mismatched field
/// path.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        format!("${path}")
    }
}

/// Attach the field path to an error, once.
fn annotate(err: Error, path: &str) -> Error {
    match err {
        Error::Encoding(msg) if !msg.contains(" at $") => {
            Error::Encoding(format!("{msg} at {}", display_path(path)))
        }
        other => other,
    }
}

pub(crate) struct ValueDeserializer {
    value: Value,
    path: String,
}

impl ValueDeserializer {
    pub(crate) fn new(value: Value) -> Self {
        Self {
            value,
            path: String::new(),
        }
    }

    fn with_path(value: Value, path: String) -> Self {
        Self { value, path }
    }

    fn type_error(&self, expected: &str) -> Error {
        Error::Encoding(format!(
            "expected {expected}, got {} at {}",
            self.value.kind(),
            display_path(&self.path)
        ))
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let path = self.path;
        let out = match self.value {
            Value::None => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Float(v) => visitor.visit_f64(v),
            Value::Strand(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, &path)),
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map, &path)),
            Value::RecordId(rid) => visitor.visit_map(RecordIdAccess::new(rid)),
        };
        out.map_err(|e| annotate(e, &path))
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::None => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if name == TOKEN_RECORD_ID {
            let path = self.path.clone();
            return match self.value {
                Value::RecordId(rid) => {
                    let mut payload = Object::new();
                    payload.insert("tb".to_string(), Value::Strand(rid.table().to_string()));
                    payload.insert("id".to_string(), rid.key().to_value());
                    visitor
                        .visit_map(MapDeserializer::new(payload, &path))
                        .map_err(|e| annotate(e, &path))
                }
                Value::Strand(s) => visitor.visit_str(&s).map_err(|e| annotate(e, &path)),
                Value::Object(map) => visitor
                    .visit_map(MapDeserializer::new(map, &path))
                    .map_err(|e| annotate(e, &path)),
                _ => Err(self.type_error("record id")),
            };
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let path = self.path.clone();
        match self.value {
            Value::Strand(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: None,
                path,
            }),
            Value::Object(map) if map.len() == 1 => {
                let (variant, value) = map.into_iter().next().unwrap();
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value: Some(value),
                    path,
                })
            }
            _ => Err(self.type_error("a variant name or single-key object")),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
    index: usize,
    path: String,
}

impl SeqDeserializer {
    fn new(items: Vec<Value>, path: &str) -> Self {
        Self {
            iter: items.into_iter(),
            index: 0,
            path: path.to_string(),
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => {
                let path = format!("{}[{}]", self.path, self.index);
                self.index += 1;
                seed.deserialize(ValueDeserializer::with_path(value, path))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: std::collections::btree_map::IntoIter<String, Value>,
    pending: Option<(String, Value)>,
    path: String,
}

impl MapDeserializer {
    fn new(map: Object, path: &str) -> Self {
        Self {
            iter: map.into_iter(),
            pending: None,
            path: path.to_string(),
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                let out = seed.deserialize(ValueDeserializer::with_path(
                    Value::Strand(key.clone()),
                    self.path.clone(),
                ))?;
                self.pending = Some((key, value));
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| Error::encoding("next_value called before next_key"))?;
        let path = format!("{}.{}", self.path, key);
        seed.deserialize(ValueDeserializer::with_path(value, path))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Presents a record id to `deserialize_any` consumers as a single-entry
/// map keyed by the private marker, so `Value`'s own visitor can
/// reconstruct the variant losslessly.
struct RecordIdAccess {
    rid: Option<RecordId>,
    payload: Option<Value>,
}

impl RecordIdAccess {
    fn new(rid: RecordId) -> Self {
        Self {
            rid: Some(rid),
            payload: None,
        }
    }
}

impl<'de> MapAccess<'de> for RecordIdAccess {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        let Some(rid) = self.rid.take() else {
            return Ok(None);
        };
        let mut payload = Object::new();
        payload.insert("tb".to_string(), Value::Strand(rid.table().to_string()));
        payload.insert("id".to_string(), rid.key().to_value());
        self.payload = Some(Value::Object(payload));
        seed.deserialize(ValueDeserializer::new(Value::Strand(
            TOKEN_RECORD_ID.to_string(),
        )))
        .map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let payload = self
            .payload
            .take()
            .ok_or_else(|| Error::encoding("next_value called before next_key"))?;
        seed.deserialize(ValueDeserializer::new(payload))
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
    path: String,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(<String as IntoDeserializer<'de, Error>>::into_deserializer(
            self.variant,
        ))?;
        Ok((
            variant,
            VariantDeserializer {
                value: self.value,
                path: self.path,
            },
        ))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
    path: String,
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            None | Some(Value::None) => Ok(()),
            Some(v) => Err(Error::Encoding(format!(
                "expected unit variant, got {} at {}",
                v.kind(),
                display_path(&self.path)
            ))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        let value = self.value.unwrap_or(Value::None);
        seed.deserialize(ValueDeserializer::with_path(value, self.path))
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(items)) => visitor.visit_seq(SeqDeserializer::new(items, &self.path)),
            Some(v) => Err(Error::Encoding(format!(
                "expected tuple variant, got {} at {}",
                v.kind(),
                display_path(&self.path)
            ))),
            None => Err(Error::Encoding(format!(
                "expected tuple variant at {}",
                display_path(&self.path)
            ))),
        }
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Object(map)) => visitor.visit_map(MapDeserializer::new(map, &self.path)),
            Some(v) => Err(Error::Encoding(format!(
                "expected struct variant, got {} at {}",
                v.kind(),
                display_path(&self.path)
            ))),
            None => Err(Error::Encoding(format!(
                "expected struct variant at {}",
                display_path(&self.path)
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("any wire value")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                i64::try_from(v).map(Value::Int).map_err(|_| {
                    de::Error::custom(format!("integer {v} out of range for the wire value"))
                })
            }

            fn visit_i128<E>(self, v: i128) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                i64::try_from(v).map(Value::Int).map_err(|_| {
                    de::Error::custom(format!("integer {v} out of range for the wire value"))
                })
            }

            fn visit_u128<E>(self, v: u128) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                i64::try_from(v).map(Value::Int).map_err(|_| {
                    de::Error::custom(format!("integer {v} out of range for the wire value"))
                })
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
                Ok(Value::Strand(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
                Ok(Value::Strand(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(v))
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::None)
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::None)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                Value::deserialize(deserializer)
            }

            fn visit_newtype_struct<D>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                Value::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut object = Object::new();
                let Some(first) = map.next_key::<String>()? else {
                    return Ok(Value::Object(object));
                };
                if first == TOKEN_RECORD_ID {
                    let payload: Value = map.next_value()?;
                    let Value::Object(mut payload) = payload else {
                        return Err(de::Error::custom("malformed record id payload"));
                    };
                    let (Some(Value::Strand(table)), Some(id)) =
                        (payload.remove("tb"), payload.remove("id"))
                    else {
                        return Err(de::Error::custom("malformed record id payload"));
                    };
                    let key = RecordIdKey::from_value(id).map_err(de::Error::custom)?;
                    return Ok(Value::RecordId(RecordId::from_parts_unchecked(table, key)));
                }
                object.insert(first, map.next_value()?);
                while let Some((key, value)) = map.next_entry()? {
                    object.insert(key, value);
                }
                Ok(Value::Object(object))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

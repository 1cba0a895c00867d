// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Relationship slots: graph edges carried on a record that only
//! round-trip to the server when explicitly loaded.

use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A relationship slot on an entity.
///
/// An unloaded slot must be omitted from serialization entirely; mark the
/// field with the skip helper:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Author {
///     name: String,
///     #[serde(default, skip_serializing_if = "Relation::is_unloaded")]
///     books: Relation<Book>,
/// }
/// ```
///
/// Serializing an unloaded slot without the attribute is an error rather
/// than a silent write of an empty edge list. Deserialization populates
/// the slot to [`Relation::Loaded`]; a missing field deserializes to
/// [`Relation::Unloaded`] through `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Relation<T> {
    /// The relationship has not been fetched.
    #[default]
    Unloaded,
    /// The related records, as fetched from the server.
    Loaded(Vec<T>),
}

impl<T> Relation<T> {
    /// True when the slot has not been fetched. Usable directly in
    /// `skip_serializing_if`.
    pub fn is_unloaded(&self) -> bool {
        matches!(self, Relation::Unloaded)
    }

    /// True when the slot holds fetched records.
    pub fn is_loaded(&self) -> bool {
        !self.is_unloaded()
    }

    /// Borrow the loaded records, if any.
    pub fn loaded(&self) -> Option<&[T]> {
        match self {
            Relation::Loaded(items) => Some(items),
            Relation::Unloaded => None,
        }
    }
}

impl<T> From<Vec<T>> for Relation<T> {
    fn from(value: Vec<T>) -> Self {
        Relation::Loaded(value)
    }
}

impl<T: Serialize> Serialize for Relation<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Relation::Unloaded => Err(serde::ser::Error::custom(
                "unloaded relation slot cannot be serialized; \
                 mark the field with skip_serializing_if = \"Relation::is_unloaded\"",
            )),
            Relation::Loaded(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Relation<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RelationVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for RelationVisitor<T> {
            type Value = Relation<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of related records, or nothing")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Relation::Unloaded)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Relation::Unloaded)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Relation::Loaded(items))
            }
        }

        deserializer.deserialize_any(RelationVisitor(std::marker::PhantomData))
    }
}

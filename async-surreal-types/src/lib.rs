// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Wire value types shared by every layer of the client.
//!
//! The [`Value`] tagged union is the sole boundary type between user
//! records and the network. User types cross that boundary through the
//! serde bridge ([`to_value`] / [`from_value`]), and values cross the
//! wire through the text ([`text`]) or binary ([`binary`]) codec.

mod de;
mod error;
mod ident;
mod record_id;
mod relation;
mod ser;
mod value;

pub mod binary;
pub mod text;

pub use de::from_value;
pub use error::{Error, RpcError};
pub use ident::{escape_ident, is_bare_ident, validate_ident, validate_table_name};
pub use record_id::{RecordId, RecordIdKey};
pub use relation::Relation;
pub use ser::to_value;
pub use value::{Object, Value};

/// Result of any operation in this crate and the crates layered on it.
pub type Result<T> = std::result::Result<T, Error>;

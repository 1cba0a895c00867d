// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! A client for a multi-model database server speaking JSON-RPC over two
//! interchangeable transports: a persistent WebSocket channel (with live
//! query notifications) and stateless HTTP exchanges.
//!
//! This crate is a facade over the workspace: [`types`] holds the wire
//! value and codecs, [`core`] the RPC framing, and [`client`] the session
//! engine, transports and client-side cache. The most used items are
//! re-exported at the root.

#[cfg(feature = "console-logging")]
pub mod console_logging;

pub use surreal_client as client;
pub use surreal_core as core;
pub use surreal_types as types;

pub use surreal_client::{
    CachePolicy, ClientConfig, Connection, Credentials, LiveStream, ReconnectPolicy, Session,
};
#[cfg(not(target_family = "wasm"))]
pub use surreal_client::{HttpTransport, WsTransport};
pub use surreal_core::{Action, Notification, PayloadFormat};
pub use surreal_types::{
    from_value, to_value, Error, RecordId, RecordIdKey, Relation, Result, RpcError, Value,
};

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The session-bearing RPC engine: transports, reconnection, the session
//! itself, live-query multiplexing and the client-side cache.
//!
//! Construct a [`Session`] over one of the two transports, `connect` it,
//! and issue operations:
//!
//! ```no_run
//! use std::sync::Arc;
//! use surreal_client::{ClientConfig, Credentials, Session, WsTransport};
//!
//! # async fn run() -> surreal_types::Result<()> {
//! let config = ClientConfig::default();
//! let transport = Arc::new(WsTransport::new("ws://localhost:8000", &config)?);
//! let db = Session::new(transport, config);
//! db.connect().await?;
//! db.signin(Credentials::root("root", "root")).await?;
//! db.use_ns_db("test", "test").await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod live;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use cache::store::memory::MemoryStore;
#[cfg(feature = "sqlite-cache")]
pub use cache::store::sqlite::SqliteStore;
pub use cache::store::CacheStore;
pub use cache::{
    CacheCoordinator, CacheEntry, CacheKey, CachePolicy, CacheStats, EvictionStrategy,
};
pub use config::ClientConfig;
pub use connection::Connection;
pub use credentials::Credentials;
pub use live::LiveStream;
pub use reconnect::{Backoff, ReconnectPolicy};
pub use session::Session;
#[cfg(not(target_family = "wasm"))]
pub use transport::http::HttpTransport;
#[cfg(not(target_family = "wasm"))]
pub use transport::ws::WsTransport;
pub use transport::{ConnectionState, Transport};

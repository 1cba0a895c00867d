// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The transport contract and its two implementations: a persistent
//! bidirectional WebSocket channel and a stateless HTTP exchange.

#[cfg(not(target_family = "wasm"))]
pub mod http;
#[cfg(not(target_family = "wasm"))]
pub mod ws;

use async_trait::async_trait;
use futures::stream::BoxStream;
use surreal_core::{Notification, Request, Response};
use surreal_types::Result;
use tokio::sync::watch;

/// Whether the transport currently has an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// A connection is established.
    Connected,
    /// No connection. The initial state, and the state after any drop.
    #[default]
    Disconnected,
}

/// Server-initiated notifications, as a finite stream. The stream ends
/// when the connection that produced it closes.
pub type NotificationStream = BoxStream<'static, Notification>;

/// The contract the session engine programs against. Both transports
/// implement it; the engine is chosen one at construction and never
/// swapped.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establish the transport. Idempotent: connecting an already
    /// connected transport is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Tear down the transport, waking all waiters with
    /// `TransportClosed`. Idempotent and best-effort.
    async fn disconnect(&self);

    /// Send one request envelope and await its matching response. Honors
    /// the configured request timeout.
    async fn send(&self, request: Request) -> Result<Response>;

    /// Whether a connection is currently established.
    fn is_connected(&self) -> bool;

    /// Whether the transport can receive server-initiated notifications.
    /// False for the stateless transport, which also refuses `let` and
    /// `unset` at the session layer.
    fn supports_notifications(&self) -> bool;

    /// Take the notification stream for the current connection lifecycle.
    ///
    /// Single consumer: the first call after each `connect` returns the
    /// live stream, later calls (and every call on a transport without
    /// notification support) return an empty, terminated stream.
    fn notifications(&self) -> NotificationStream;

    /// Observe connection state transitions.
    fn state_watch(&self) -> watch::Receiver<ConnectionState>;

    /// Hint the authentication token for exchanges that carry it
    /// out-of-band (the stateless transport's `Authorization` header).
    fn set_auth_token(&self, _token: Option<&str>) {}

    /// Hint the selected namespace and database for exchanges that carry
    /// them out-of-band (the stateless transport's `surreal-ns` /
    /// `surreal-db` headers).
    fn set_selection(&self, _selection: Option<(&str, &str)>) {}
}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The engine's capability set as an object-safe trait, so a
//! remote-proxy implementation can wrap the local session without
//! inheritance. Composition only: [`crate::Session`] implements it, and
//! anything wrapping a `dyn Connection` conforms too.

use async_trait::async_trait;

use surreal_types::{Object, RecordId, Result, Value};

use crate::credentials::Credentials;
use crate::live::LiveStream;
use crate::session::Session;

/// The user-facing operations at the wire value level.
///
/// Typed convenience wrappers (generic `select<T>` and friends) live on
/// the concrete [`Session`]; this trait carries the object-safe core so
/// implementations can be composed and proxied.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Establish the connection. Idempotent.
    async fn connect(&self) -> Result<()>;
    /// Disconnect, cancel reconnection and finish subscriptions.
    async fn disconnect(&self);
    /// Whether the transport is currently connected.
    fn is_connected(&self) -> bool;

    /// Round-trip a ping.
    async fn ping(&self) -> Result<()>;
    /// The server version string.
    async fn version(&self) -> Result<String>;
    /// Information about the authenticated session.
    async fn info(&self) -> Result<Value>;

    /// Select the namespace and database.
    async fn use_ns_db(&self, namespace: &str, database: &str) -> Result<()>;
    /// Sign in, returning the token.
    async fn signin(&self, credentials: Credentials) -> Result<String>;
    /// Sign up with record-access credentials, returning the token.
    async fn signup(&self, credentials: Credentials) -> Result<String>;
    /// Authenticate with a token.
    async fn authenticate(&self, token: &str) -> Result<()>;
    /// Invalidate the current authentication.
    async fn invalidate(&self) -> Result<()>;

    /// Define a connection-scoped variable.
    async fn set(&self, name: &str, value: Value) -> Result<()>;
    /// Remove a connection-scoped variable.
    async fn unset(&self, name: &str) -> Result<()>;

    /// Execute a query string.
    async fn query(&self, sql: &str, vars: Option<Object>) -> Result<Vec<Value>>;
    /// Select a table or record.
    async fn select_value(&self, target: &str) -> Result<Value>;
    /// Create a record.
    async fn create_value(&self, target: &str, data: Option<Value>) -> Result<Value>;
    /// Insert records.
    async fn insert_value(&self, target: &str, data: Value) -> Result<Value>;
    /// Replace a record or table.
    async fn update_value(&self, target: &str, data: Option<Value>) -> Result<Value>;
    /// Create-or-update a record or table.
    async fn upsert_value(&self, target: &str, data: Option<Value>) -> Result<Value>;
    /// Merge data into a record or table.
    async fn merge_value(&self, target: &str, data: Value) -> Result<Value>;
    /// Patch a record or table.
    async fn patch_value(&self, target: &str, patches: Value) -> Result<Value>;
    /// Delete a record or table.
    async fn delete(&self, target: &str) -> Result<()>;
    /// Relate two records through an edge table.
    async fn relate_value(
        &self,
        from: &RecordId,
        edge: &str,
        to: &RecordId,
        data: Option<Value>,
    ) -> Result<Value>;

    /// Start a live query.
    async fn live(&self, table: &str, diff: bool) -> Result<(String, LiveStream)>;
    /// Attach another stream to a subscription.
    async fn subscribe_live(&self, id: &str) -> Result<LiveStream>;
    /// Kill a live query.
    async fn kill(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl Connection for Session {
    async fn connect(&self) -> Result<()> {
        Session::connect(self).await
    }

    async fn disconnect(&self) {
        Session::disconnect(self).await
    }

    fn is_connected(&self) -> bool {
        Session::is_connected(self)
    }

    async fn ping(&self) -> Result<()> {
        Session::ping(self).await
    }

    async fn version(&self) -> Result<String> {
        Session::version(self).await
    }

    async fn info(&self) -> Result<Value> {
        Session::info(self).await
    }

    async fn use_ns_db(&self, namespace: &str, database: &str) -> Result<()> {
        Session::use_ns_db(self, namespace, database).await
    }

    async fn signin(&self, credentials: Credentials) -> Result<String> {
        Session::signin(self, credentials).await
    }

    async fn signup(&self, credentials: Credentials) -> Result<String> {
        Session::signup(self, credentials).await
    }

    async fn authenticate(&self, token: &str) -> Result<()> {
        Session::authenticate(self, token).await
    }

    async fn invalidate(&self) -> Result<()> {
        Session::invalidate(self).await
    }

    async fn set(&self, name: &str, value: Value) -> Result<()> {
        Session::set(self, name, value).await
    }

    async fn unset(&self, name: &str) -> Result<()> {
        Session::unset(self, name).await
    }

    async fn query(&self, sql: &str, vars: Option<Object>) -> Result<Vec<Value>> {
        Session::query(self, sql, vars).await
    }

    async fn select_value(&self, target: &str) -> Result<Value> {
        Session::select_value(self, target).await
    }

    async fn create_value(&self, target: &str, data: Option<Value>) -> Result<Value> {
        Session::create_value(self, target, data).await
    }

    async fn insert_value(&self, target: &str, data: Value) -> Result<Value> {
        Session::insert_value(self, target, data).await
    }

    async fn update_value(&self, target: &str, data: Option<Value>) -> Result<Value> {
        Session::update_value(self, target, data).await
    }

    async fn upsert_value(&self, target: &str, data: Option<Value>) -> Result<Value> {
        Session::upsert_value(self, target, data).await
    }

    async fn merge_value(&self, target: &str, data: Value) -> Result<Value> {
        Session::merge_value(self, target, data).await
    }

    async fn patch_value(&self, target: &str, patches: Value) -> Result<Value> {
        Session::patch_value(self, target, patches).await
    }

    async fn delete(&self, target: &str) -> Result<()> {
        Session::delete(self, target).await
    }

    async fn relate_value(
        &self,
        from: &RecordId,
        edge: &str,
        to: &RecordId,
        data: Option<Value>,
    ) -> Result<Value> {
        Session::relate_value(self, from, edge, to, data).await
    }

    async fn live(&self, table: &str, diff: bool) -> Result<(String, LiveStream)> {
        Session::live(self, table, diff).await
    }

    async fn subscribe_live(&self, id: &str) -> Result<LiveStream> {
        Session::subscribe_live(self, id).await
    }

    async fn kill(&self, id: &str) -> Result<()> {
        Session::kill(self, id).await
    }
}

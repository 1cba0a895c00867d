// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The session engine: owns the transport, authentication state,
//! namespace selection, the live-query router and the cache, and exposes
//! the user-facing operations.

mod services;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;

use surreal_core::handle::RequestIdGenerator;
use surreal_core::messages::methods;
use surreal_core::metrics::RequestPhase;
use surreal_core::sync::Mutex;
use surreal_core::Request;

use surreal_types::{from_value, to_value, Error, RecordId, Result, Value};

use crate::cache::store::memory::MemoryStore;
use crate::cache::store::CacheStore;
use crate::cache::CacheCoordinator;
use crate::config::ClientConfig;
use crate::live::LiveRouter;
use crate::reconnect::ReconnectPolicy;
use crate::transport::{ConnectionState, Transport};

/// A session against one server over one transport.
///
/// Cloning is cheap and shares the same underlying session; operations
/// may be issued concurrently from any number of clones. The transport
/// is chosen at construction and never swapped.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: ClientConfig,
    pub(crate) ids: RequestIdGenerator,
    pub(crate) auth_token: ArcSwapOption<String>,
    pub(crate) selection: ArcSwapOption<(String, String)>,
    pub(crate) live: LiveRouter,
    pub(crate) cache: Option<CacheCoordinator>,
    pub(crate) should_reconnect: AtomicBool,
    notification_task: Mutex<Option<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session over the given transport. When the config
    /// carries a cache policy, the cache uses in-memory storage; use
    /// [`Session::with_store`] to plug a different backend.
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        Self::with_store(transport, config, store)
    }

    /// Create a session with an explicit cache storage backend. The
    /// backend is unused when the config has no cache policy.
    pub fn with_store(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        let cache = config
            .cache
            .clone()
            .map(|policy| CacheCoordinator::new(store, policy));
        Self {
            inner: Arc::new(SessionInner {
                transport,
                config,
                ids: RequestIdGenerator::new(),
                auth_token: ArcSwapOption::empty(),
                selection: ArcSwapOption::empty(),
                live: LiveRouter::new(),
                cache,
                should_reconnect: AtomicBool::new(true),
                notification_task: Mutex::new(None),
                reconnect_task: Mutex::new(None),
            }),
        }
    }

    /// Establish the transport and start the background tasks.
    /// Idempotent.
    pub async fn connect(&self) -> Result<()> {
        self.inner.should_reconnect.store(true, Ordering::Relaxed);
        if self.inner.transport.is_connected() {
            return Ok(());
        }
        self.inner.transport.connect().await?;
        self.spawn_notification_router();
        self.spawn_reconnect_loop();
        Ok(())
    }

    /// Disconnect and stop reconnecting. Best-effort and idempotent:
    /// repeated calls produce no further effects. Pending requests are
    /// drained with `TransportClosed` and every live stream is finished.
    pub async fn disconnect(&self) {
        self.inner.should_reconnect.store(false, Ordering::Relaxed);
        let reconnect = self.inner.reconnect_task.lock().take();
        if let Some(task) = reconnect {
            task.abort();
        }
        self.inner.transport.disconnect().await;
        let notification = self.inner.notification_task.lock().take();
        if let Some(task) = notification {
            // Ends on its own once the transport drops its notification
            // stream.
            let _ = task.await;
        }
        self.inner.live.close_all();
    }

    /// Alias for [`Session::disconnect`].
    pub async fn close(&self) {
        self.disconnect().await;
    }

    /// Whether the transport currently has an established connection.
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Notifications dropped because a consumer fell behind.
    pub fn missed_notifications(&self) -> u64 {
        self.inner.live.missed_notifications()
    }

    /// The cache coordinator, when caching is enabled.
    pub fn cache(&self) -> Option<&CacheCoordinator> {
        self.inner.cache.as_ref()
    }

    // ------------------------------------------------------------------
    // Internals shared by the service impls.
    // ------------------------------------------------------------------

    pub(crate) async fn send_request(
        &self,
        method: &'static str,
        params: Option<Vec<Value>>,
    ) -> Result<Value> {
        let started = Instant::now();
        let mut request = Request::new(self.inner.ids.next_id(), method);
        if let Some(params) = params {
            request = request.with_params(params);
        }
        let response = match self.inner.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                self.inner
                    .config
                    .metrics
                    .on_request_failure(method, RequestPhase::Network);
                return Err(e);
            }
        };
        match response.result {
            Ok(value) => {
                self.inner
                    .config
                    .metrics
                    .on_request_success(method, started.elapsed());
                Ok(value)
            }
            Err(rpc) => {
                self.inner
                    .config
                    .metrics
                    .on_request_failure(method, RequestPhase::Network);
                Err(Error::Rpc(rpc))
            }
        }
    }

    pub(crate) fn encode_data<T: Serialize>(&self, method: &'static str, data: &T) -> Result<Value> {
        to_value(data).map_err(|e| {
            self.inner
                .config
                .metrics
                .on_request_failure(method, RequestPhase::Encode);
            e
        })
    }

    pub(crate) fn decode_value<T: DeserializeOwned>(
        &self,
        method: &'static str,
        value: Value,
    ) -> Result<T> {
        from_value(value).map_err(|e| {
            self.inner
                .config
                .metrics
                .on_request_failure(method, RequestPhase::Decode);
            e
        })
    }

    /// Decode a result that is an array of records.
    pub(crate) fn decode_array<T: DeserializeOwned>(
        &self,
        method: &'static str,
        value: Value,
    ) -> Result<Vec<T>> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.decode_value(method, item))
                .collect(),
            Value::None => Ok(Vec::new()),
            single => Ok(vec![self.decode_value(method, single)?]),
        }
    }

    /// Decode a result that may be a single record or a one-element
    /// array of records, depending on the target shape.
    pub(crate) fn decode_flat<T: DeserializeOwned>(
        &self,
        method: &'static str,
        value: Value,
    ) -> Result<T> {
        match value {
            Value::Array(mut items) if items.len() == 1 => {
                let single = items.pop().expect("length checked");
                match from_value::<T>(single.clone()) {
                    Ok(decoded) => Ok(decoded),
                    Err(_) => self.decode_value(method, Value::Array(vec![single])),
                }
            }
            other => self.decode_value(method, other),
        }
    }

    pub(crate) fn require_notifications(&self, operation: &str) -> Result<()> {
        if self.inner.transport.supports_notifications() {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(format!(
                "`{operation}` requires the persistent transport"
            )))
        }
    }

    pub(crate) fn store_token(&self, token: Option<&str>) {
        self.inner
            .auth_token
            .store(token.map(|t| Arc::new(t.to_string())));
        self.inner.transport.set_auth_token(token);
    }

    // ------------------------------------------------------------------
    // Background tasks.
    // ------------------------------------------------------------------

    /// One router per connection lifecycle: consumes the transport's
    /// notification stream, fans out to subscribers and feeds cache
    /// invalidation. When the stream ends the connection is gone and the
    /// server has forgotten our subscriptions, so all sinks finish.
    ///
    /// The task holds only a weak reference so an abandoned session can
    /// still drop.
    fn spawn_notification_router(&self) {
        let mut stream = self.inner.transport.notifications();
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let table = inner
                    .live
                    .dispatch(notification, inner.config.metrics.as_ref());
                if let (Some(cache), Some(table)) = (&inner.cache, table) {
                    if cache.policy().invalidate_on_live_query {
                        cache.invalidate(&table).await;
                    }
                }
            }
            if let Some(inner) = weak.upgrade() {
                inner.live.close_all();
            }
        });
        let previous = self.inner.notification_task.lock().replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn spawn_reconnect_loop(&self) {
        if matches!(self.inner.config.reconnect, ReconnectPolicy::Never) {
            return;
        }
        let mut guard = self.inner.reconnect_task.lock();
        if guard.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let state_rx = self.inner.transport.state_watch();
        *guard = Some(tokio::spawn(run_reconnect_loop(weak, state_rx)));
    }

    /// Replay authentication and namespace selection on a fresh
    /// connection, then restart the notification router. Live
    /// subscriptions are not re-issued; their streams ended with the old
    /// connection and the caller must issue new `live` calls.
    async fn restore_session(&self) -> Result<()> {
        if let Some(token) = self.inner.auth_token.load_full() {
            self.send_request(
                methods::AUTHENTICATE,
                Some(vec![Value::Strand(token.as_ref().clone())]),
            )
            .await?;
        }
        if let Some(selection) = self.inner.selection.load_full() {
            self.send_request(
                methods::USE,
                Some(vec![
                    Value::Strand(selection.0.clone()),
                    Value::Strand(selection.1.clone()),
                ]),
            )
            .await?;
        }
        // The server forgot the old subscriptions with the old
        // connection; finish any sink the old router did not get to.
        self.inner.live.close_all();
        self.spawn_notification_router();
        Ok(())
    }
}

/// Watches the transport state and reapplies the reconnection policy on
/// every drop. Parked, it holds only a weak reference to the session and
/// the state receiver, so abandoning the session ends the task.
async fn run_reconnect_loop(
    weak: std::sync::Weak<SessionInner>,
    mut state_rx: tokio::sync::watch::Receiver<ConnectionState>,
) {
    loop {
        if *state_rx.borrow_and_update() == ConnectionState::Connected {
            if state_rx.changed().await.is_err() {
                return;
            }
            continue;
        }
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let session = Session { inner };
        if !session.inner.should_reconnect.load(Ordering::Relaxed) {
            // Explicit disconnect. Stay parked until a later connect()
            // flips the flag and the state changes again.
            drop(session);
            if state_rx.changed().await.is_err() {
                return;
            }
            continue;
        }

        let Some(backoff) = session.inner.config.reconnect.new_backoff() else {
            return;
        };
        let mut restored = false;
        for delay in backoff {
            tokio::time::sleep(delay).await;
            if !session.inner.should_reconnect.load(Ordering::Relaxed) {
                break;
            }
            match session.inner.transport.connect().await {
                Ok(()) => match session.restore_session().await {
                    Ok(()) => {
                        info!("session restored after reconnect");
                        restored = true;
                        break;
                    }
                    Err(e) => {
                        // A reconnected session without our token and
                        // namespace is worse than none; drop it and keep
                        // trying.
                        warn!("session restore failed: {e}");
                        session.inner.transport.disconnect().await;
                    }
                },
                Err(e) => {
                    debug!("reconnect attempt failed: {e}");
                }
            }
        }
        if !restored && session.inner.should_reconnect.load(Ordering::Relaxed) {
            warn!("reconnect attempts exhausted, staying disconnected");
            return;
        }
    }
}

/// Split a target string into the table it affects and the wire
/// parameter to send. A target is either a table name (bare or
/// backtick-quoted) or a record id in `table:id` form.
pub(crate) fn resolve_target(target: &str) -> Result<(String, Value)> {
    if surreal_types::validate_table_name(target).is_ok() {
        let table = if target.starts_with('`') {
            // RecordId::new unquotes a validated quoted table name.
            RecordId::new(target, 0i64)?.table().to_string()
        } else {
            target.to_string()
        };
        return Ok((table, Value::Strand(target.to_string())));
    }
    if target.contains(':') {
        let rid: RecordId = target.parse()?;
        return Ok((rid.table().to_string(), Value::Strand(target.to_string())));
    }
    Err(Error::Validation(format!(
        "`{target}` is neither a valid table name nor a record id"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_resolve_to_tables() {
        let (table, param) = resolve_target("users").unwrap();
        assert_eq!(table, "users");
        assert_eq!(param, Value::Strand("users".into()));

        let (table, _) = resolve_target("users:alice").unwrap();
        assert_eq!(table, "users");

        let (table, _) = resolve_target("`odd name`").unwrap();
        assert_eq!(table, "odd name");

        assert!(resolve_target("").is_err());
        assert!(resolve_target("no spaces allowed").is_err());
    }
}

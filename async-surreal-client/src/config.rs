// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use surreal_core::metrics::{MetricsSink, NoopMetrics};
use surreal_core::PayloadFormat;

use crate::cache::CachePolicy;
use crate::reconnect::ReconnectPolicy;

/// Configuration for a [`crate::Session`] and its transport.
///
/// All options have the documented defaults; override with the builder
/// methods. Logging goes through the `log` facade; install whatever
/// logger you like (the facade crate's `console-logging` feature wires
/// up `env_logger`).
#[derive(Clone)]
pub struct ClientConfig {
    /// Per-RPC timeout. Default 30 seconds.
    pub request_timeout: Duration,
    /// Transport connect timeout. Default 10 seconds.
    pub connection_timeout: Duration,
    /// On-wire payload encoding. Default text.
    pub payload_format: PayloadFormat,
    /// Bounded connection pool size for the stateless transport.
    /// Default 8.
    pub http_connection_pool_size: usize,
    /// What to do when the persistent transport drops. Default
    /// exponential backoff with 10 attempts.
    pub reconnect: ReconnectPolicy,
    /// Client-side cache policy. `None` disables the cache entirely.
    pub cache: Option<CachePolicy>,
    /// Metrics sink, called on request success and failure. Default
    /// no-op.
    pub metrics: Arc<dyn MetricsSink>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            payload_format: PayloadFormat::Text,
            http_connection_pool_size: 8,
            reconnect: ReconnectPolicy::default(),
            cache: None,
            metrics: Arc::new(NoopMetrics),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("request_timeout", &self.request_timeout)
            .field("connection_timeout", &self.connection_timeout)
            .field("payload_format", &self.payload_format)
            .field("http_connection_pool_size", &self.http_connection_pool_size)
            .field("reconnect", &self.reconnect)
            .field("cache", &self.cache)
            .finish()
    }
}

impl ClientConfig {
    /// Set the per-RPC timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the transport connect timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Select the on-wire payload encoding.
    pub fn payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = format;
        self
    }

    /// Set the stateless transport's connection pool size.
    pub fn http_connection_pool_size(mut self, size: usize) -> Self {
        self.http_connection_pool_size = size;
        self
    }

    /// Select the reconnection policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Enable the client-side cache with the given policy.
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    /// Install a metrics sink.
    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }
}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The metrics hook. The engine reports request outcomes here; the
//! default sink does nothing.

use std::time::Duration;

/// The phase a request failed in, when that is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Building the wire value or serializing the envelope.
    Encode,
    /// The network exchange itself.
    Network,
    /// Decoding the response into the caller's type.
    Decode,
}

/// A sink for request metrics. Implement this to feed your own metrics
/// backend; all methods default to no-ops.
pub trait MetricsSink: Send + Sync {
    /// A request completed successfully.
    #[allow(unused)]
    fn on_request_success(&self, method: &str, elapsed: Duration) {}

    /// A request failed in the given phase.
    #[allow(unused)]
    fn on_request_failure(&self, method: &str, phase: RequestPhase) {}

    /// A live notification was dropped because its sink was full.
    #[allow(unused)]
    fn on_missed_notification(&self, subscription_id: &str) {}
}

/// The default sink: discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]

//! Functionality shared by every transport and the session engine:
//! RPC envelopes and their wire encodings, request id generation,
//! endpoint URL handling and the metrics hook.

pub mod handle;
pub mod metrics;
pub mod url;

pub mod messages;
pub use messages::{Action, Notification, PayloadFormat, Request, Response, ServerMessage};

/// Common synchronous locks. Re-exports locks from parking_lot used internally.
pub mod sync {
    /// Read-write lock. Use this if you usually only need to read the value.
    pub type RwLock<T> = parking_lot::RwLock<T>;
    /// Mutually exclusive lock. Use this if you need both read and write often.
    pub type Mutex<T> = parking_lot::Mutex<T>;
}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The user-facing operations, grouped the way the protocol groups them:
//! authentication and session state, data access, live queries.

mod auth;
mod data;
mod live;

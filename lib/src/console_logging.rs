// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Convenience console logger, enabled with the `console-logging`
//! feature. Honors `RUST_LOG` the way `env_logger` normally does.

/// Install a logger that writes to stderr. Call once, early.
pub fn init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}

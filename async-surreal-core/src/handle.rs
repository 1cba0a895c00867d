// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Generates request ids unique within a connection lifetime.
///
/// Ids are a per-connection random salt joined to a monotonic counter,
/// so collisions are impossible by construction rather than just
/// statistically unlikely, and ids from different connections never
/// alias each other in logs.
#[derive(Debug)]
pub struct RequestIdGenerator {
    salt: String,
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Create a generator with a fresh salt. Call once per connection.
    pub fn new() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self {
            salt: uuid[..8].to_string(),
            next: AtomicU64::new(1),
        }
    }

    /// The next request id.
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.salt)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let gen = RequestIdGenerator::new();
        let ids: HashSet<String> = (0..10_000).map(|_| gen.next_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn generators_use_distinct_salts() {
        let a = RequestIdGenerator::new();
        let b = RequestIdGenerator::new();
        assert_ne!(a.next_id(), b.next_id());
    }
}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Pluggable cache storage backends.

pub mod memory;

#[cfg(feature = "sqlite-cache")]
pub mod sqlite;

#[cfg(all(feature = "browser-cache", target_family = "wasm"))]
pub mod browser;

use async_trait::async_trait;

use surreal_types::Result;

use super::{CacheEntry, CacheKey};

/// The storage contract the cache coordinator programs against.
///
/// Implementations must be safe for concurrent access; operations may
/// interleave freely.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry.
    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<()>;

    /// Remove one entry. Removing a missing key is not an error.
    async fn remove(&self, key: &CacheKey) -> Result<()>;

    /// Remove every entry.
    async fn remove_all(&self) -> Result<()>;

    /// Remove every entry whose dependency set contains `table`.
    async fn remove_entries_for_table(&self, table: &str) -> Result<()>;

    /// Every entry, ordered by `last_accessed_at` ascending.
    async fn all_entries(&self) -> Result<Vec<(CacheKey, CacheEntry)>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;

    /// True when the store holds nothing.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }
}

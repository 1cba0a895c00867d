// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The client-side query cache: read-through storage of decoded wire
//! values keyed by request shape, with table-granular invalidation, TTL
//! expiry and LRU eviction.
//!
//! Concurrency note: cache reads are not serialized with in-flight
//! mutations to the same table. A read dispatched before an invalidation
//! may still populate the cache with its result afterwards; the cache is
//! last-writer-wins, with no generation tagging.

pub mod store;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use surreal_types::Value;

use store::CacheStore;

/// Identifies one cacheable request: the method, its target and a hash
/// of the remaining parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The RPC method, e.g. `select`.
    pub method: String,
    /// The method target (table or record id).
    pub target: String,
    /// Hash of the canonical binary encoding of the parameter list.
    /// Deterministic within a process; a persisted cache hashed by a
    /// different standard library degrades to a cold cache.
    pub params_hash: String,
}

impl CacheKey {
    /// Build a key for `method` on `target` with the given parameters.
    ///
    /// Parameter hashing uses the canonical binary encoding: object keys
    /// are sorted, array order is preserved.
    pub fn new(method: &str, target: &str, params: &[Value]) -> Self {
        let bytes = surreal_types::binary::serialize_binary(&Value::Array(params.to_vec()))
            .unwrap_or_else(|_| format!("{params:?}").into_bytes());
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            method: method.to_string(),
            target: target.to_string(),
            params_hash: format!("{:016x}", hasher.finish()),
        }
    }

    /// The flat storage key used by backends that key by a single
    /// string. The separator cannot appear in method names or targets.
    pub fn storage_key(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.method, self.target, self.params_hash
        )
    }
}

/// One cached result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached wire value.
    pub value: Value,
    /// Tables this entry depends on; invalidating any of them removes
    /// the entry.
    pub tables: Vec<String>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last read.
    pub last_accessed_at: DateTime<Utc>,
    /// How many times the entry was read.
    pub access_count: u64,
    /// Optional time-to-live, measured from `created_at`.
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    /// Create a fresh entry.
    pub fn new(value: Value, tables: Vec<String>, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        Self {
            value,
            tables,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl,
        }
    }

    /// True when the entry's TTL has elapsed.
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => {
                let age = Utc::now().signed_duration_since(self.created_at);
                age > chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
            }
            None => false,
        }
    }

    /// Record a read.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
        self.access_count += 1;
    }

    /// True when the entry depends on `table`.
    pub fn depends_on(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }
}

/// The eviction strategy. Only least-recently-used is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionStrategy {
    /// Evict by `last_accessed_at`, oldest first.
    #[default]
    Lru,
}

/// Cache behavior knobs.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// TTL applied to new entries. `None` means entries never expire.
    pub default_ttl: Option<Duration>,
    /// Entry count that triggers eviction. `None` means unbounded.
    pub max_entries: Option<usize>,
    /// How to pick eviction victims.
    pub eviction: EvictionStrategy,
    /// Invalidate a table's entries when a live notification for it
    /// arrives.
    pub invalidate_on_live_query: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            default_ttl: None,
            max_entries: None,
            eviction: EvictionStrategy::Lru,
            invalidate_on_live_query: true,
        }
    }
}

/// Counts and extremes over the current cache contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Live entries, including not-yet-purged expired ones.
    pub entries: usize,
    /// Sum of every entry's access count.
    pub total_access_count: u64,
    /// Creation time of the oldest entry.
    pub oldest_created_at: Option<DateTime<Utc>>,
    /// Creation time of the newest entry.
    pub newest_created_at: Option<DateTime<Utc>>,
    /// Least recent access time across entries.
    pub least_recently_accessed_at: Option<DateTime<Utc>>,
    /// Most recent access time across entries.
    pub most_recently_accessed_at: Option<DateTime<Utc>>,
}

/// The read-through cache used by the session engine.
///
/// Storage failures are logged and degrade to cache misses; they never
/// fail the request that consulted the cache.
pub struct CacheCoordinator {
    store: Arc<dyn CacheStore>,
    policy: CachePolicy,
}

impl CacheCoordinator {
    /// Create a coordinator over the given storage backend.
    pub fn new(store: Arc<dyn CacheStore>, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Look up a cached value. Expired entries are removed and reported
    /// as misses; hits update the entry's access metadata.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("cache read failed, treating as miss: {e}");
                return None;
            }
        };
        if entry.is_expired() {
            debug!("cache entry for {} {} expired", key.method, key.target);
            if let Err(e) = self.store.remove(key).await {
                warn!("failed to remove expired cache entry: {e}");
            }
            return None;
        }
        let mut entry = entry;
        entry.touch();
        let value = entry.value.clone();
        if let Err(e) = self.store.set(key, entry).await {
            warn!("failed to update cache access metadata: {e}");
        }
        Some(value)
    }

    /// Store a value with its table dependencies, evicting first when
    /// the store is at capacity.
    pub async fn set(&self, key: &CacheKey, value: Value, tables: Vec<String>) {
        if let Some(max_entries) = self.policy.max_entries {
            match self.store.count().await {
                Ok(count) if count >= max_entries => self.evict(max_entries).await,
                Ok(_) => {}
                Err(e) => warn!("cache count failed: {e}"),
            }
        }
        let entry = CacheEntry::new(value, tables, self.policy.default_ttl);
        if let Err(e) = self.store.set(key, entry).await {
            warn!("cache write failed: {e}");
        }
    }

    /// Remove roughly a tenth of capacity, least recently used first,
    /// plus anything already expired.
    async fn evict(&self, max_entries: usize) {
        let entries = match self.store.all_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cache eviction scan failed: {e}");
                return;
            }
        };
        let mut victims_left = (max_entries / 10).max(1);
        for (key, entry) in &entries {
            let expired = entry.is_expired();
            if !expired && victims_left == 0 {
                continue;
            }
            if let Err(e) = self.store.remove(key).await {
                warn!("cache eviction failed for {}: {e}", key.target);
                continue;
            }
            if !expired {
                victims_left -= 1;
            }
        }
    }

    /// Remove every entry that depends on `table`.
    pub async fn invalidate(&self, table: &str) {
        debug!("invalidating cache entries for table {table}");
        if let Err(e) = self.store.remove_entries_for_table(table).await {
            warn!("cache invalidation for {table} failed: {e}");
        }
    }

    /// Remove everything.
    pub async fn invalidate_all(&self) {
        if let Err(e) = self.store.remove_all().await {
            warn!("cache clear failed: {e}");
        }
    }

    /// Counts and extremes over the current contents.
    pub async fn stats(&self) -> CacheStats {
        let entries = match self.store.all_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cache stats scan failed: {e}");
                return CacheStats::default();
            }
        };
        let mut stats = CacheStats {
            entries: entries.len(),
            ..CacheStats::default()
        };
        for (_, entry) in &entries {
            stats.total_access_count += entry.access_count;
            stats.oldest_created_at = Some(match stats.oldest_created_at {
                Some(t) => t.min(entry.created_at),
                None => entry.created_at,
            });
            stats.newest_created_at = Some(match stats.newest_created_at {
                Some(t) => t.max(entry.created_at),
                None => entry.created_at,
            });
            stats.least_recently_accessed_at = Some(match stats.least_recently_accessed_at {
                Some(t) => t.min(entry.last_accessed_at),
                None => entry.last_accessed_at,
            });
            stats.most_recently_accessed_at = Some(match stats.most_recently_accessed_at {
                Some(t) => t.max(entry.last_accessed_at),
                None => entry.last_accessed_at,
            });
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::store::memory::MemoryStore;
    use super::*;

    fn coordinator(policy: CachePolicy) -> CacheCoordinator {
        CacheCoordinator::new(Arc::new(MemoryStore::new()), policy)
    }

    fn key(target: &str) -> CacheKey {
        CacheKey::new("select", target, &[Value::Strand(target.into())])
    }

    #[tokio::test]
    async fn get_miss_then_hit() {
        let cache = coordinator(CachePolicy::default());
        let k = key("users");
        assert!(cache.get(&k).await.is_none());
        cache
            .set(&k, Value::Int(1), vec!["users".to_string()])
            .await;
        assert_eq!(cache.get(&k).await, Some(Value::Int(1)));
    }

    #[tokio::test]
    async fn hits_update_access_metadata() {
        let cache = coordinator(CachePolicy::default());
        let k = key("users");
        cache.set(&k, Value::Int(1), vec!["users".into()]).await;
        cache.get(&k).await;
        cache.get(&k).await;
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.total_access_count, 2);
    }

    #[tokio::test]
    async fn ttl_expiry_is_a_miss_and_removes_the_entry() {
        let cache = coordinator(CachePolicy {
            default_ttl: Some(Duration::from_millis(20)),
            ..CachePolicy::default()
        });
        let k = key("x");
        cache.set(&k, Value::Int(1), vec!["x".into()]).await;
        assert!(cache.get(&k).await.is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get(&k).await.is_none());
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn invalidate_removes_only_dependent_entries() {
        let cache = coordinator(CachePolicy::default());
        cache
            .set(&key("users"), Value::Int(1), vec!["users".into()])
            .await;
        cache
            .set(&key("orders"), Value::Int(2), vec!["orders".into()])
            .await;
        cache
            .set(
                &key("mixed"),
                Value::Int(3),
                vec!["users".into(), "orders".into()],
            )
            .await;

        cache.invalidate("users").await;

        assert!(cache.get(&key("users")).await.is_none());
        assert!(cache.get(&key("mixed")).await.is_none());
        assert_eq!(cache.get(&key("orders")).await, Some(Value::Int(2)));
    }

    #[tokio::test]
    async fn invalidate_all_empties_the_store() {
        let cache = coordinator(CachePolicy::default());
        for i in 0..5 {
            cache
                .set(&key(&format!("t{i}")), Value::Int(i), vec![format!("t{i}")])
                .await;
        }
        cache.invalidate_all().await;
        for i in 0..5 {
            assert!(cache.get(&key(&format!("t{i}"))).await.is_none());
        }
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn lru_eviction_removes_the_least_recently_used() {
        let cache = coordinator(CachePolicy {
            max_entries: Some(10),
            ..CachePolicy::default()
        });
        for i in 0..10 {
            cache
                .set(&key(&format!("t{i}")), Value::Int(i), vec![format!("t{i}")])
                .await;
            // Keep access times strictly ordered.
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        // Refresh t0 so t1 becomes the eviction victim.
        assert!(cache.get(&key("t0")).await.is_some());

        cache
            .set(&key("t10"), Value::Int(10), vec!["t10".into()])
            .await;

        assert!(cache.get(&key("t1")).await.is_none(), "t1 should be evicted");
        assert!(cache.get(&key("t0")).await.is_some());
        assert!(cache.get(&key("t10")).await.is_some());
    }

    #[test]
    fn params_hash_is_order_sensitive_for_arrays() {
        let a = CacheKey::new("query", "q", &[Value::Int(1), Value::Int(2)]);
        let b = CacheKey::new("query", "q", &[Value::Int(2), Value::Int(1)]);
        assert_ne!(a.params_hash, b.params_hash);
    }

    #[test]
    fn params_hash_ignores_object_insertion_order() {
        use surreal_types::Object;
        let mut x = Object::new();
        x.insert("a".into(), Value::Int(1));
        x.insert("b".into(), Value::Int(2));
        let mut y = Object::new();
        y.insert("b".into(), Value::Int(2));
        y.insert("a".into(), Value::Int(1));
        let a = CacheKey::new("query", "q", &[Value::Object(x)]);
        let b = CacheKey::new("query", "q", &[Value::Object(y)]);
        assert_eq!(a.params_hash, b.params_hash);
    }
}

// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! In-memory cache storage. Available on every platform, including
//! restricted ones; contents live as long as the process.

use async_trait::async_trait;
use hashbrown::HashMap;

use surreal_core::sync::RwLock;
use surreal_types::Result;

use super::CacheStore;
use crate::cache::{CacheEntry, CacheKey};

/// A hash-map backed store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        self.entries.write().insert(key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn remove_all(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn remove_entries_for_table(&self, table: &str) -> Result<()> {
        self.entries
            .write()
            .retain(|_, entry| !entry.depends_on(table));
        Ok(())
    }

    async fn all_entries(&self) -> Result<Vec<(CacheKey, CacheEntry)>> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by_key(|(_, entry)| entry.last_accessed_at);
        Ok(entries)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surreal_types::Value;

    fn key(target: &str) -> CacheKey {
        CacheKey::new("select", target, &[])
    }

    fn entry(tables: &[&str]) -> CacheEntry {
        CacheEntry::new(
            Value::Int(1),
            tables.iter().map(|t| t.to_string()).collect(),
            None,
        )
    }

    #[tokio::test]
    async fn basic_lifecycle() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await.unwrap());

        store.set(&key("a"), entry(&["a"])).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get(&key("a")).await.unwrap().is_some());

        store.remove(&key("a")).await.unwrap();
        assert!(store.get(&key("a")).await.unwrap().is_none());
        // Removing again is fine.
        store.remove(&key("a")).await.unwrap();
    }

    #[tokio::test]
    async fn table_removal_matches_membership() {
        let store = MemoryStore::new();
        store.set(&key("a"), entry(&["users"])).await.unwrap();
        store
            .set(&key("b"), entry(&["users", "orders"]))
            .await
            .unwrap();
        store.set(&key("c"), entry(&["orders"])).await.unwrap();

        store.remove_entries_for_table("users").await.unwrap();

        assert!(store.get(&key("a")).await.unwrap().is_none());
        assert!(store.get(&key("b")).await.unwrap().is_none());
        assert!(store.get(&key("c")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn all_entries_orders_by_access_time() {
        let store = MemoryStore::new();
        let mut first = entry(&["a"]);
        first.touch();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let mut second = entry(&["b"]);
        second.touch();

        // Inserted newest-first to prove ordering comes from the data.
        store.set(&key("b"), second).await.unwrap();
        store.set(&key("a"), first).await.unwrap();

        let entries = store.all_entries().await.unwrap();
        assert_eq!(entries[0].0, key("a"));
        assert_eq!(entries[1].0, key("b"));
    }
}

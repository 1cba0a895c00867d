// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Browser key-value cache storage on top of `localStorage`.
//!
//! Entries are stored under prefix-scoped keys; a sidecar JSON index
//! keeps per-entry metadata (tables, access time) so membership lookups
//! and ordering do not deserialize every entry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use surreal_types::{Error, Result};

use super::CacheStore;
use crate::cache::{CacheEntry, CacheKey};

const DEFAULT_PREFIX: &str = "surreal-cache";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarIndex {
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    method: String,
    target: String,
    params_hash: String,
    tables: Vec<String>,
    last_accessed_at: DateTime<Utc>,
}

/// A cache store over the browser's `localStorage`.
pub struct BrowserStore {
    prefix: String,
}

fn store_err(context: &str) -> Error {
    Error::connection(format!("browser cache store: {context}"))
}

fn storage() -> Result<web_sys::Storage> {
    web_sys::window()
        .ok_or_else(|| store_err("no window object"))?
        .local_storage()
        .map_err(|_| store_err("localStorage is not accessible"))?
        .ok_or_else(|| store_err("localStorage is not available"))
}

impl BrowserStore {
    /// Create a store with the default key prefix.
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create a store with a custom key prefix, so multiple caches can
    /// share one origin.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn entry_key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.prefix, key.storage_key())
    }

    fn index_key(&self) -> String {
        format!("{}:__index", self.prefix)
    }

    fn load_index(&self) -> Result<SidecarIndex> {
        let storage = storage()?;
        let raw = storage
            .get_item(&self.index_key())
            .map_err(|_| store_err("failed to read index"))?;
        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| store_err(&format!("corrupt index: {e}"))),
            None => Ok(SidecarIndex::default()),
        }
    }

    fn save_index(&self, index: &SidecarIndex) -> Result<()> {
        let storage = storage()?;
        let raw = serde_json::to_string(index)
            .map_err(|e| store_err(&format!("failed to serialize index: {e}")))?;
        storage
            .set_item(&self.index_key(), &raw)
            .map_err(|_| store_err("failed to write index, storage may be full"))
    }
}

impl Default for BrowserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for BrowserStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let storage = storage()?;
        let raw = storage
            .get_item(&self.entry_key(key))
            .map_err(|_| store_err("failed to read entry"))?;
        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| store_err(&format!("corrupt entry: {e}"))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        let storage = storage()?;
        let raw = serde_json::to_string(&entry)
            .map_err(|e| store_err(&format!("failed to serialize entry: {e}")))?;
        storage
            .set_item(&self.entry_key(key), &raw)
            .map_err(|_| store_err("failed to write entry, storage may be full"))?;

        let mut index = self.load_index()?;
        index.entries.insert(
            key.storage_key(),
            IndexEntry {
                method: key.method.clone(),
                target: key.target.clone(),
                params_hash: key.params_hash.clone(),
                tables: entry.tables.clone(),
                last_accessed_at: entry.last_accessed_at,
            },
        );
        self.save_index(&index)
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let storage = storage()?;
        storage
            .remove_item(&self.entry_key(key))
            .map_err(|_| store_err("failed to remove entry"))?;
        let mut index = self.load_index()?;
        index.entries.remove(&key.storage_key());
        self.save_index(&index)
    }

    async fn remove_all(&self) -> Result<()> {
        let storage = storage()?;
        let index = self.load_index()?;
        for storage_key in index.entries.keys() {
            storage
                .remove_item(&format!("{}:{}", self.prefix, storage_key))
                .map_err(|_| store_err("failed to remove entry"))?;
        }
        self.save_index(&SidecarIndex::default())
    }

    async fn remove_entries_for_table(&self, table: &str) -> Result<()> {
        let storage = storage()?;
        let mut index = self.load_index()?;
        let doomed: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, meta)| meta.tables.iter().any(|t| t == table))
            .map(|(k, _)| k.clone())
            .collect();
        for storage_key in &doomed {
            storage
                .remove_item(&format!("{}:{}", self.prefix, storage_key))
                .map_err(|_| store_err("failed to remove entry"))?;
            index.entries.remove(storage_key);
        }
        self.save_index(&index)
    }

    async fn all_entries(&self) -> Result<Vec<(CacheKey, CacheEntry)>> {
        let storage = storage()?;
        let index = self.load_index()?;
        let mut metas: Vec<(&String, &IndexEntry)> = index.entries.iter().collect();
        metas.sort_by_key(|(_, meta)| meta.last_accessed_at);

        let mut entries = Vec::with_capacity(metas.len());
        for (storage_key, meta) in metas {
            let raw = storage
                .get_item(&format!("{}:{}", self.prefix, storage_key))
                .map_err(|_| store_err("failed to read entry"))?;
            let Some(raw) = raw else { continue };
            let entry: CacheEntry = serde_json::from_str(&raw)
                .map_err(|e| store_err(&format!("corrupt entry: {e}")))?;
            entries.push((
                CacheKey {
                    method: meta.method.clone(),
                    target: meta.target.clone(),
                    params_hash: meta.params_hash.clone(),
                },
                entry,
            ));
        }
        Ok(entries)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load_index()?.entries.len())
    }
}

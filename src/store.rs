//! In-memory keyed request stores.
//!
//! Each store is an explicit, dependency-injected repository owned by
//! the composition root — never a process-wide singleton — so tests can
//! instantiate isolated stores per case. State is process-lifetime only
//! and lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::StoreError;

/// A keyed in-memory store with atomic read-modify-write updates.
///
/// All mutation goes through the single write lock, which serializes
/// concurrent interactions for the same key (two racing events for one
/// subject cannot produce a lost update).
pub struct MemoryStore<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone + Send + Sync> MemoryStore<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Insert a new entry, rejecting the write if the key is taken.
    ///
    /// This is the at-most-one-active-request invariant: a duplicate
    /// never overwrites the original.
    pub async fn insert_new(&self, key: &str, value: T) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Insert or replace an entry.
    pub async fn upsert(&self, key: &str, value: T) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Mutate an entry in place under the write lock and return the
    /// updated value.
    pub async fn update<F>(&self, key: &str, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        mutate(entry);
        Ok(entry.clone())
    }

    pub async fn remove(&self, key: &str) -> Option<T> {
        self.entries.write().await.remove(key)
    }

    /// Keep only entries for which the predicate holds. Returns the
    /// number of entries dropped; used by the retention sweep.
    pub async fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str, &T) -> bool,
    {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, value| keep(key, value));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

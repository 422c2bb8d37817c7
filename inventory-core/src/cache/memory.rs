//! In-process cache backend

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::FastCache;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Concurrent in-memory cache with lazy expiry.
///
/// Expired entries are dropped when touched; `set_nx` treats an expired
/// entry as absent, which is what makes it usable as a lock primitive.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(value: String, ttl: Option<Duration>) -> Entry {
        Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }
}

#[async_trait]
impl FastCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expired());
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        self.entries.insert(key.to_string(), Self::entry(value, ttl));
    }

    async fn set_nx(&self, key: &str, value: String, ttl: Option<Duration>) -> bool {
        // Entry-level locking in DashMap makes the check-and-insert atomic
        let mut won = false;
        let entry = self
            .entries
            .entry(key.to_string())
            .and_modify(|existing| {
                if existing.expired() {
                    *existing = Self::entry(value.clone(), ttl);
                    won = true;
                }
            });
        if let dashmap::mapref::entry::Entry::Vacant(vacant) = entry {
            vacant.insert(Self::entry(value, ttl));
            won = true;
        }
        won
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn delete_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }
}

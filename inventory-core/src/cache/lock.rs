//! Distributed refresh lock

use std::time::Duration;

use super::{REFRESH_LOCK_KEY, SharedCache};

/// Lease-based mutual exclusion for the account-wide refresh job.
///
/// The lock is a `set_nx` entry whose TTL is the lease: if the holder
/// dies without releasing, the lease expires and the next caller can
/// acquire. Release is owner-checked so a holder that overran its lease
/// cannot drop a lock someone else has since taken.
#[derive(Clone)]
pub struct RefreshLock {
    cache: SharedCache,
    lease: Duration,
}

impl RefreshLock {
    pub fn new(cache: SharedCache, lease: Duration) -> Self {
        Self { cache, lease }
    }

    /// Try to take the lock for `owner`; false means someone else holds it
    pub async fn acquire(&self, owner: &str) -> bool {
        self.cache
            .set_nx(REFRESH_LOCK_KEY, owner.to_string(), Some(self.lease))
            .await
    }

    /// Release the lock if `owner` still holds it
    pub async fn release(&self, owner: &str) {
        if self.cache.get(REFRESH_LOCK_KEY).await.as_deref() == Some(owner) {
            self.cache.delete(REFRESH_LOCK_KEY).await;
        }
    }

    pub async fn held(&self) -> bool {
        self.cache.exists(REFRESH_LOCK_KEY).await
    }
}

//! Fast cache layer
//!
//! Key-value cache with TTLs sitting in front of the database. The trait
//! keeps services backend-agnostic; the default backend is an in-process
//! [`MemoryCache`]. Cache operations are best-effort and infallible from
//! the caller's point of view: a cache that loses a key only costs a
//! recomputation.

pub mod lock;
pub mod memory;

pub use lock::RefreshLock;
pub use memory::MemoryCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Key-value cache with per-entry TTLs
#[async_trait]
pub trait FastCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>);
    /// Set only if absent; returns whether the write happened
    async fn set_nx(&self, key: &str, value: String, ttl: Option<Duration>) -> bool;
    async fn exists(&self, key: &str) -> bool;
    async fn delete(&self, key: &str);
    async fn delete_prefix(&self, prefix: &str);
}

pub type SharedCache = Arc<dyn FastCache>;

/// Cache key for a (product, store) monthly-needed value
pub fn monthly_sales_key(product_number: i64, store_code: &str) -> String {
    format!("monthly_sales:{product_number}:{store_code}")
}

/// Cache key for a product's live stock payload
pub fn stock_key(product_pos_id: uuid::Uuid) -> String {
    format!("stock:{product_pos_id}")
}

/// Cache key for a background refresh job's status
pub fn job_key(job_id: &str) -> String {
    format!("refresh_job:{job_id}")
}

/// Lock key guarding the account-wide refresh job
pub const REFRESH_LOCK_KEY: &str = "refresh_job:lock";

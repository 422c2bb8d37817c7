//! Core configuration
//!
//! All knobs can be overridden through environment variables:
//!
//! | Environment variable        | Default              | Meaning |
//! |-----------------------------|----------------------|---------|
//! | INVENTORY_DATA_DIR          | /var/lib/inventory   | embedded database location |
//! | INVENTORY_FAST_TTL_SECS     | 3600                 | fast-tier cache TTL |
//! | INVENTORY_STALE_AFTER_SECS  | 1800                 | persisted monthly-sales staleness |
//! | INVENTORY_LOCK_LEASE_SECS   | 1800                 | refresh lock lease |
//! | INVENTORY_JOB_RETENTION_SECS| 3600                 | how long job status stays pollable |
//! | INVENTORY_WINDOW_DAYS       | 30                   | default sales lookback window |

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for the embedded database
    pub data_dir: String,
    /// Fast-tier (key-value) cache TTL
    pub fast_ttl: Duration,
    /// Age after which a persisted MonthlySales row counts as stale
    pub stale_after: Duration,
    /// Lease on the full-refresh lock; bounds how long a crashed job can
    /// wedge it
    pub lock_lease: Duration,
    /// Retention of finished job status records
    pub job_retention: Duration,
    /// Default sales lookback window in days
    pub window_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "/var/lib/inventory".into(),
            fast_ttl: Duration::from_secs(3600),
            stale_after: Duration::from_secs(1800),
            lock_lease: Duration::from_secs(1800),
            job_retention: Duration::from_secs(3600),
            window_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, with defaults for
    /// anything unset
    pub fn from_env() -> Self {
        let secs = |name: &str, default: u64| {
            Duration::from_secs(
                std::env::var(name)
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default),
            )
        };
        Self {
            data_dir: std::env::var("INVENTORY_DATA_DIR")
                .unwrap_or_else(|_| "/var/lib/inventory".into()),
            fast_ttl: secs("INVENTORY_FAST_TTL_SECS", 3600),
            stale_after: secs("INVENTORY_STALE_AFTER_SECS", 1800),
            lock_lease: secs("INVENTORY_LOCK_LEASE_SECS", 1800),
            job_retention: secs("INVENTORY_JOB_RETENTION_SECS", 3600),
            window_days: std::env::var("INVENTORY_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

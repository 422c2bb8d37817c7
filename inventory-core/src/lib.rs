//! Inventory sync/cache core
//!
//! Pulls catalog, store, stock and receipt data from the POS cloud API,
//! reconciles it into local persistent records, and answers stock and
//! monthly-sales queries through a multi-tier cache that stays useful when
//! the upstream API is slow or down. The web/CLI layer above this crate
//! only ever calls the service structs in [`services`].

pub mod cache;
pub mod core;
pub mod db;
pub mod services;

pub use crate::core::config::Config;
pub use crate::core::error::{AppError, AppResult};
pub use crate::db::DbService;
pub use crate::services::refresh::RefreshRunner;
pub use crate::services::sales::SalesService;
pub use crate::services::stock::StockService;
pub use crate::services::sync::SyncService;

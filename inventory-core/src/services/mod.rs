//! Service layer
//!
//! The operations callers are meant to use: sync passes against the POS
//! API, cached stock and monthly-sales queries, and the background full
//! refresh. Services own repositories and share one [`PosClient`] and one
//! fast cache.
//!
//! [`PosClient`]: pos_client::PosClient

pub mod refresh;
pub mod sales;
pub mod stock;
pub mod sync;

pub use refresh::{JobState, JobStatus, RefreshRunner};
pub use sales::{SalesService, WarmReport};
pub use stock::{StockAnswer, StockService, StockSyncReport};
pub use sync::{SyncReport, SyncService};

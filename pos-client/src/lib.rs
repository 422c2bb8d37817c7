//! POS Cloud API client
//!
//! Read-only client for the account-scoped POS cloud endpoints (catalog,
//! organizational units, per-product stock levels, transaction receipts).
//! Every outbound call goes through a shared circuit breaker and a bounded
//! retry policy; list endpoints are consumed through a generic paginated
//! fetcher.

pub mod breaker;
pub mod client;
pub mod config;
pub mod error;
pub mod sales;
pub mod types;

pub use breaker::{BreakerState, CircuitBreaker};
pub use client::{Paginated, PosClient};
pub use config::PosConfig;
pub use error::{ClientError, ClientResult};
pub use sales::{SalesAggregate, SalesQuery, SalesWindow, monthly_needed};
pub use types::{
    AddressRecord, AmountRecord, OrgUnitRecord, PageEnvelope, ProductRecord, ReceiptItemRecord,
    ReceiptRecord, StockLevelRecord,
};

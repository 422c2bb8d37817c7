//! Persistent models
//!
//! One file per entity; record keys are the natural business identifiers
//! (store: POS uuid, product: numeric business key, stock/monthly-sales:
//! composite `{number}_{store_code}`), so upserts are plain keyed writes.

pub mod monthly_sales;
pub mod product;
pub mod stock;
pub mod store;

pub use monthly_sales::MonthlySales;
pub use product::Product;
pub use stock::ProductStock;
pub use store::Store;

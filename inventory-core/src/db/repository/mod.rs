//! Repository Module
//!
//! Keyed CRUD over the SurrealDB tables. Record ids are deterministic
//! business keys, so every sync write is an `UPSERT` on a known id.

pub mod monthly_sales;
pub mod product;
pub mod stock;
pub mod store;

pub use monthly_sales::MonthlySalesRepository;
pub use product::ProductRepository;
pub use stock::StockRepository;
pub use store::StoreRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

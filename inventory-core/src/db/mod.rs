//! Database module
//!
//! Embedded SurrealDB connection and schema definition.

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::core::error::{AppError, AppResult};

const NAMESPACE: &str = "inventory";
const DATABASE: &str = "inventory";

/// Database service — owns the embedded SurrealDB handle
#[derive(Debug, Clone)]
pub struct DbService {
    db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database under `data_dir`
    pub async fn open(data_dir: &str) -> AppResult<Self> {
        let db = Surreal::new::<RocksDb>(data_dir)
            .await
            .map_err(|e| AppError::Database(format!("failed to open database: {e}")))?;
        Self::init(db).await
    }

    /// In-memory database, used by tests
    pub async fn memory() -> AppResult<Self> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::Database(format!("failed to open memory database: {e}")))?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> AppResult<Self> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::Database(format!("failed to select namespace: {e}")))?;

        // Uniqueness lives in the schema, not in application checks
        db.query(
            "
            DEFINE INDEX IF NOT EXISTS store_code_idx ON TABLE store FIELDS code;
            DEFINE INDEX IF NOT EXISTS product_pos_idx ON TABLE product FIELDS pos_id;
            DEFINE INDEX IF NOT EXISTS stock_pair_idx ON TABLE product_stock
                FIELDS product_number, store_code UNIQUE;
            DEFINE INDEX IF NOT EXISTS monthly_pair_idx ON TABLE monthly_sales
                FIELDS product_number, store_code UNIQUE;
            ",
        )
        .await
        .map_err(|e| AppError::Database(format!("failed to define schema: {e}")))?;

        tracing::info!("database ready");
        Ok(Self { db })
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

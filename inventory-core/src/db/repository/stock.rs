//! Stock Repository

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::ProductStock;
use crate::db::models::stock::STOCK_TABLE;

/// Outcome of a full stock replacement for one product
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplaceOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

#[derive(Clone)]
pub struct StockRepository {
    base: BaseRepository,
}

impl StockRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn get(&self, product_number: i64, store_code: &str) -> RepoResult<Option<ProductStock>> {
        let row: Option<ProductStock> = self
            .base
            .db()
            .select((STOCK_TABLE, ProductStock::key(product_number, store_code)))
            .await?;
        Ok(row)
    }

    pub async fn rows_for_product(&self, product_number: i64) -> RepoResult<Vec<ProductStock>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM product_stock WHERE product_number = $number ORDER BY store_code")
            .bind(("number", product_number))
            .await?;
        let rows: Vec<ProductStock> = result.take(0)?;
        Ok(rows)
    }

    /// Write one (product, store) row without touching siblings
    pub async fn upsert_row(&self, row: ProductStock) -> RepoResult<ProductStock> {
        let id = row.record_id();
        let mut result = self
            .base
            .db()
            .query("UPSERT $id CONTENT $data")
            .bind(("id", id))
            .bind(("data", row))
            .await?;
        let written: Vec<ProductStock> = result.take(0)?;
        written
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("product_stock upsert returned nothing".into()))
    }

    /// Replace a product's full stock set in one transaction.
    ///
    /// Upserts every row in `rows` and deletes the product's rows for store
    /// codes not present in the new set, so a warehouse dropped by the POS
    /// disappears locally in the same write.
    pub async fn replace_for_product(
        &self,
        product_number: i64,
        rows: Vec<ProductStock>,
    ) -> RepoResult<ReplaceOutcome> {
        let existing = self.rows_for_product(product_number).await?;
        let existing_codes: Vec<String> =
            existing.iter().map(|row| row.store_code.clone()).collect();

        let mut outcome = ReplaceOutcome::default();
        let keep_codes: Vec<String> = rows.iter().map(|row| row.store_code.clone()).collect();
        for row in &rows {
            if existing_codes.contains(&row.store_code) {
                outcome.updated += 1;
            } else {
                outcome.created += 1;
            }
        }
        outcome.deleted = existing_codes
            .iter()
            .filter(|code| !keep_codes.contains(code))
            .count();

        let mut sql = String::from("BEGIN TRANSACTION;");
        for i in 0..rows.len() {
            sql.push_str(&format!(" UPSERT $id{i} CONTENT $data{i};"));
        }
        sql.push_str(
            " DELETE product_stock WHERE product_number = $number AND store_code NOTINSIDE $keep;",
        );
        sql.push_str(" COMMIT TRANSACTION;");

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("number", product_number))
            .bind(("keep", keep_codes));
        for (i, row) in rows.into_iter().enumerate() {
            let id = row.record_id();
            query = query.bind((format!("id{i}"), id)).bind((format!("data{i}"), row));
        }
        query.await?;
        Ok(outcome)
    }

    /// Delete all stock rows for a product; returns how many were removed
    pub async fn clear_for_product(&self, product_number: i64) -> RepoResult<usize> {
        let mut result = self
            .base
            .db()
            .query("DELETE product_stock WHERE product_number = $number RETURN BEFORE")
            .bind(("number", product_number))
            .await?;
        let removed: Vec<ProductStock> = result.take(0)?;
        Ok(removed.len())
    }

    /// Flag a product's rows as served-from-cache fallback data
    pub async fn mark_cached(&self, product_number: i64) -> RepoResult<Vec<ProductStock>> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE product_stock SET cached = true
                 WHERE product_number = $number RETURN AFTER",
            )
            .bind(("number", product_number))
            .await?;
        let rows: Vec<ProductStock> = result.take(0)?;
        Ok(rows)
    }
}

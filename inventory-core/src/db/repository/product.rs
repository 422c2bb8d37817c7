//! Product Repository

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::Product;
use crate::db::models::product::PRODUCT_TABLE;

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product ORDER BY number")
            .await?
            .take(0)?;
        Ok(products)
    }

    pub async fn find_by_number(&self, number: i64) -> RepoResult<Option<Product>> {
        let product: Option<Product> = self.base.db().select((PRODUCT_TABLE, number)).await?;
        Ok(product)
    }

    /// Products that carry a POS id and can be refreshed against the API.
    ///
    /// `numbers` narrows the set; `limit` bounds it.
    pub async fn find_syncable(
        &self,
        numbers: Option<Vec<i64>>,
        limit: Option<usize>,
    ) -> RepoResult<Vec<Product>> {
        let mut sql = String::from("SELECT * FROM product WHERE pos_id != NONE AND pos_id != NULL");
        if numbers.is_some() {
            sql.push_str(" AND number INSIDE $numbers");
        }
        sql.push_str(" ORDER BY number");
        if limit.is_some() {
            sql.push_str(" LIMIT $limit");
        }

        let mut query = self.base.db().query(sql);
        if let Some(numbers) = numbers {
            query = query.bind(("numbers", numbers));
        }
        if let Some(limit) = limit {
            query = query.bind(("limit", limit));
        }
        let products: Vec<Product> = query.await?.take(0)?;
        Ok(products)
    }

    pub async fn count(&self) -> RepoResult<usize> {
        let mut result = self
            .base
            .db()
            .query("SELECT count() AS total FROM product GROUP ALL")
            .await?;
        let counts: Vec<serde_json::Value> = result.take(0)?;
        Ok(counts
            .first()
            .and_then(|row| row.get("total"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    /// Write a product keyed by its business number
    pub async fn upsert(&self, product: Product) -> RepoResult<Product> {
        let id = product.record_id();
        let mut result = self
            .base
            .db()
            .query("UPSERT $id CONTENT $data")
            .bind(("id", id))
            .bind(("data", product))
            .await?;
        let written: Vec<Product> = result.take(0)?;
        written
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("product upsert returned nothing".into()))
    }
}

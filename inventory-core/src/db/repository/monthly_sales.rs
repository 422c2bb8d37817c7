//! Monthly Sales Repository

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::MonthlySales;
use crate::db::models::monthly_sales::MONTHLY_SALES_TABLE;

#[derive(Clone)]
pub struct MonthlySalesRepository {
    base: BaseRepository,
}

impl MonthlySalesRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn get(&self, product_number: i64, store_code: &str) -> RepoResult<Option<MonthlySales>> {
        let row: Option<MonthlySales> = self
            .base
            .db()
            .select((MONTHLY_SALES_TABLE, MonthlySales::key(product_number, store_code)))
            .await?;
        Ok(row)
    }

    pub async fn for_product(&self, product_number: i64) -> RepoResult<Vec<MonthlySales>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM monthly_sales WHERE product_number = $number ORDER BY store_code")
            .bind(("number", product_number))
            .await?;
        let rows: Vec<MonthlySales> = result.take(0)?;
        Ok(rows)
    }

    pub async fn upsert(&self, row: MonthlySales) -> RepoResult<MonthlySales> {
        let id = row.record_id();
        let mut result = self
            .base
            .db()
            .query("UPSERT $id CONTENT $data")
            .bind(("id", id))
            .bind(("data", row))
            .await?;
        let written: Vec<MonthlySales> = result.take(0)?;
        written
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("monthly_sales upsert returned nothing".into()))
    }

    /// Write a batch of rows in one transaction
    pub async fn upsert_many(&self, rows: Vec<MonthlySales>) -> RepoResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len();
        let mut sql = String::from("BEGIN TRANSACTION;");
        for i in 0..count {
            sql.push_str(&format!(" UPSERT $id{i} CONTENT $data{i};"));
        }
        sql.push_str(" COMMIT TRANSACTION;");

        let mut query = self.base.db().query(sql);
        for (i, row) in rows.into_iter().enumerate() {
            let id = row.record_id();
            query = query.bind((format!("id{i}"), id)).bind((format!("data{i}"), row));
        }
        query.await?;
        Ok(count)
    }
}

//! Store Repository

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

use super::{BaseRepository, RepoResult};
use crate::db::models::Store;
use crate::db::models::store::STORE_TABLE;

#[derive(Clone)]
pub struct StoreRepository {
    base: BaseRepository,
}

impl StoreRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Store>> {
        let stores: Vec<Store> = self
            .base
            .db()
            .query("SELECT * FROM store ORDER BY code")
            .await?
            .take(0)?;
        Ok(stores)
    }

    pub async fn find_active(&self) -> RepoResult<Vec<Store>> {
        let stores: Vec<Store> = self
            .base
            .db()
            .query("SELECT * FROM store WHERE active = true ORDER BY code")
            .await?
            .take(0)?;
        Ok(stores)
    }

    /// Find a store by its local business code
    pub async fn find_by_code(&self, code: &str) -> RepoResult<Option<Store>> {
        let code = code.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM store WHERE code = $code LIMIT 1")
            .bind(("code", code))
            .await?;
        let stores: Vec<Store> = result.take(0)?;
        Ok(stores.into_iter().next())
    }

    pub async fn find_by_pos_id(&self, pos_id: Uuid) -> RepoResult<Option<Store>> {
        let store: Option<Store> = self
            .base
            .db()
            .select((STORE_TABLE, pos_id.to_string()))
            .await?;
        Ok(store)
    }

    /// Write a store keyed by its POS id
    pub async fn upsert(&self, store: Store) -> RepoResult<Store> {
        let id = store.record_id();
        let mut result = self
            .base
            .db()
            .query("UPSERT $id CONTENT $data")
            .bind(("id", id))
            .bind(("data", store))
            .await?;
        let written: Vec<Store> = result.take(0)?;
        written
            .into_iter()
            .next()
            .ok_or_else(|| super::RepoError::Database("store upsert returned nothing".into()))
    }

    /// Mark every store whose POS id is not in `seen` as inactive.
    ///
    /// Stores are never deleted; returns the codes that were deactivated.
    pub async fn deactivate_missing(&self, seen: Vec<Uuid>) -> RepoResult<Vec<String>> {
        let seen: Vec<String> = seen.into_iter().map(|id| id.to_string()).collect();
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE store SET active = false
                 WHERE active = true AND <string> pos_id NOTINSIDE $seen
                 RETURN AFTER",
            )
            .bind(("seen", seen))
            .await?;
        let deactivated: Vec<Store> = result.take(0)?;
        Ok(deactivated.into_iter().map(|s| s.code).collect())
    }
}

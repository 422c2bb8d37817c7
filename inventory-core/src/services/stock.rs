//! Stock queries and stock sync

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use pos_client::PosClient;

use crate::cache::{self, SharedCache};
use crate::core::config::Config;
use crate::core::error::{AppError, AppResult};
use crate::db::DbService;
use crate::db::models::{Product, ProductStock, Store};
use crate::db::repository::stock::ReplaceOutcome;
use crate::db::repository::{ProductRepository, StockRepository, StoreRepository};

/// Stock rows for one product, with provenance.
///
/// `cached` is true when the rows come from persistence because the live
/// lookup failed; a caller showing quantities can flag them as possibly
/// out of date.
#[derive(Debug, Clone, Serialize)]
pub struct StockAnswer {
    pub rows: Vec<ProductStock>,
    pub cached: bool,
}

/// Counts from one stock sync pass
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StockSyncReport {
    pub products: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Products whose lookup failed; their rows were left untouched
    pub failed: usize,
}

impl StockSyncReport {
    fn absorb(&mut self, outcome: ReplaceOutcome) {
        self.created += outcome.created;
        self.updated += outcome.updated;
        self.deleted += outcome.deleted;
    }
}

/// Per-product stock levels, live from the POS with persisted fallback
#[derive(Clone)]
pub struct StockService {
    client: Arc<PosClient>,
    products: ProductRepository,
    stores: StoreRepository,
    stock: StockRepository,
    cache: SharedCache,
    config: Config,
}

impl StockService {
    pub fn new(client: Arc<PosClient>, db: &DbService, cache: SharedCache, config: Config) -> Self {
        Self {
            client,
            products: ProductRepository::new(db.db().clone()),
            stores: StoreRepository::new(db.db().clone()),
            stock: StockRepository::new(db.db().clone()),
            cache,
            config,
        }
    }

    /// Stores keyed by POS id, for resolving warehouse references
    async fn store_index(&self) -> AppResult<HashMap<Uuid, Store>> {
        let stores = self.stores.find_all().await?;
        Ok(stores.into_iter().map(|s| (s.pos_id, s)).collect())
    }

    fn rows_from_levels(
        levels: &[pos_client::StockLevelRecord],
        product_number: i64,
        index: &HashMap<Uuid, Store>,
    ) -> Vec<ProductStock> {
        let mut rows = Vec::new();
        for level in levels {
            let Some(warehouse_id) = level.warehouse_id() else {
                tracing::warn!(product_number, "stock entry without warehouse id, skipping");
                continue;
            };
            let Some(store) = index.get(&warehouse_id) else {
                tracing::warn!(
                    product_number,
                    %warehouse_id,
                    "stock entry for unknown store, skipping"
                );
                continue;
            };
            rows.push(ProductStock::from_wire(level, product_number, &store.code));
        }
        rows
    }

    /// Current stock for one product, optionally narrowed to one store.
    ///
    /// Tier 1 is the fast cache (the whole per-product payload); tier 2 a
    /// live POS lookup that also refreshes persistence; and when the POS
    /// is unreachable the persisted rows are served flagged `cached`.
    /// `force_refresh` skips tier 1. Only a product with no rows anywhere
    /// propagates the API error.
    pub async fn get_stock(
        &self,
        product_number: i64,
        store_code: Option<&str>,
        force_refresh: bool,
    ) -> AppResult<StockAnswer> {
        let product = self
            .products
            .find_by_number(product_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("product {product_number}")))?;
        let pos_id = product.pos_id.ok_or_else(|| {
            AppError::validation(format!("product {product_number} has no POS id"))
        })?;
        if let Some(code) = store_code {
            self.stores
                .find_by_code(code)
                .await?
                .ok_or_else(|| AppError::not_found(format!("store {code}")))?;
        }

        let narrow = |mut answer: StockAnswer| {
            if let Some(code) = store_code {
                answer.rows.retain(|row| row.store_code == code);
            }
            answer
        };

        let key = cache::stock_key(pos_id);
        if !force_refresh {
            if let Some(payload) = self.cache.get(&key).await {
                if let Ok(rows) = serde_json::from_str::<Vec<ProductStock>>(&payload) {
                    return Ok(narrow(StockAnswer { rows, cached: false }));
                }
                self.cache.delete(&key).await;
            }
        }

        match self.refresh_product(&product).await {
            Ok((rows, _)) => {
                if let Ok(payload) = serde_json::to_string(&rows) {
                    self.cache.set(&key, payload, Some(self.config.fast_ttl)).await;
                }
                Ok(narrow(StockAnswer { rows, cached: false }))
            }
            Err(err) => {
                let fallback = self.stock.mark_cached(product_number).await?;
                if fallback.is_empty() {
                    return Err(err);
                }
                tracing::warn!(
                    product_number,
                    "live stock lookup failed, serving persisted rows: {err}"
                );
                Ok(narrow(StockAnswer {
                    rows: fallback,
                    cached: true,
                }))
            }
        }
    }

    /// Drop the fast-tier entry for one product
    pub async fn invalidate(&self, product_number: i64) -> AppResult<()> {
        let product = self
            .products
            .find_by_number(product_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("product {product_number}")))?;
        if let Some(pos_id) = product.pos_id {
            self.cache.delete(&cache::stock_key(pos_id)).await;
        }
        Ok(())
    }

    /// Drop every fast-tier stock entry
    pub async fn invalidate_all(&self) {
        self.cache.delete_prefix("stock:").await;
    }

    /// Fetch one product's stock from the POS and reconcile persistence.
    ///
    /// A `204 No Content` answer means the POS tracks no stock for the
    /// product, so local rows are pruned.
    async fn refresh_product(&self, product: &Product) -> AppResult<(Vec<ProductStock>, ReplaceOutcome)> {
        let pos_id = product.pos_id.ok_or_else(|| {
            AppError::validation(format!("product {} has no POS id", product.number))
        })?;

        let Some(levels) = self.client.product_stocks(pos_id).await? else {
            let deleted = self.stock.clear_for_product(product.number).await?;
            return Ok((
                Vec::new(),
                ReplaceOutcome {
                    deleted,
                    ..Default::default()
                },
            ));
        };

        let index = self.store_index().await?;
        let rows = Self::rows_from_levels(&levels, product.number, &index);
        let outcome = self
            .stock
            .replace_for_product(product.number, rows.clone())
            .await?;
        Ok((rows, outcome))
    }

    /// Refresh persisted stock for one product, or one (product, store)
    /// pair. The single-store form only writes that store's row and never
    /// prunes siblings.
    pub async fn sync_stock(
        &self,
        product_number: i64,
        store_code: Option<&str>,
    ) -> AppResult<StockSyncReport> {
        let product = self
            .products
            .find_by_number(product_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("product {product_number}")))?;

        let mut report = StockSyncReport {
            products: 1,
            ..Default::default()
        };

        match store_code {
            None => {
                let (_, outcome) = self.refresh_product(&product).await?;
                report.absorb(outcome);
            }
            Some(code) => {
                let store = self
                    .stores
                    .find_by_code(code)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("store {code}")))?;
                let pos_id = product.pos_id.ok_or_else(|| {
                    AppError::validation(format!("product {product_number} has no POS id"))
                })?;

                let levels = self.client.product_stocks(pos_id).await?.unwrap_or_default();
                let level = levels
                    .iter()
                    .find(|l| l.warehouse_id() == Some(store.pos_id));
                match level {
                    Some(level) => {
                        let row = ProductStock::from_wire(level, product_number, &store.code);
                        let existed = self.stock.get(product_number, code).await?.is_some();
                        self.stock.upsert_row(row).await?;
                        if existed {
                            report.updated += 1;
                        } else {
                            report.created += 1;
                        }
                    }
                    None => {
                        tracing::info!(product_number, code, "POS reports no stock at this store");
                    }
                }
            }
        }

        if let Some(pos_id) = product.pos_id {
            self.cache.delete(&cache::stock_key(pos_id)).await;
        }
        Ok(report)
    }

    /// Refresh persisted stock for many products in one pass.
    ///
    /// `numbers` narrows the set, `limit` bounds it. A product whose
    /// lookup fails is counted and skipped; the pass continues.
    pub async fn sync_all(
        &self,
        numbers: Option<Vec<i64>>,
        limit: Option<usize>,
    ) -> AppResult<StockSyncReport> {
        let products = self.products.find_syncable(numbers, limit).await?;
        let mut report = StockSyncReport {
            products: products.len(),
            ..Default::default()
        };

        for product in &products {
            match self.refresh_product(product).await {
                Ok((_, outcome)) => report.absorb(outcome),
                Err(err) => {
                    tracing::warn!(number = product.number, "stock refresh failed: {err}");
                    report.failed += 1;
                }
            }
            if let Some(pos_id) = product.pos_id {
                self.cache.delete(&cache::stock_key(pos_id)).await;
            }
        }

        tracing::info!(
            products = report.products,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failed,
            "stock sync complete"
        );
        Ok(report)
    }
}

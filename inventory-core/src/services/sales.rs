//! Monthly-sales queries and the bulk warm pass

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use pos_client::{PosClient, SalesQuery, SalesWindow};

use crate::cache::{self, SharedCache};
use crate::core::config::Config;
use crate::core::error::{AppError, AppResult};
use crate::db::DbService;
use crate::db::models::{MonthlySales, Store};
use crate::db::repository::{MonthlySalesRepository, ProductRepository, StoreRepository};

/// Batch size for persisted monthly-sales writes
const UPSERT_CHUNK: usize = 200;

/// Counts from a bulk monthly-sales warm pass
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WarmReport {
    pub products: usize,
    pub stores: usize,
    pub rows_written: usize,
    /// Products skipped because they carry no POS id
    pub skipped: usize,
}

/// Answers "how many units a month does this store need of this product",
/// through three tiers: fast cache, persisted row, live receipt scan.
#[derive(Clone)]
pub struct SalesService {
    client: Arc<PosClient>,
    products: ProductRepository,
    stores: StoreRepository,
    monthly: MonthlySalesRepository,
    cache: SharedCache,
    config: Config,
}

impl SalesService {
    pub fn new(client: Arc<PosClient>, db: &DbService, cache: SharedCache, config: Config) -> Self {
        Self {
            client,
            products: ProductRepository::new(db.db().clone()),
            stores: StoreRepository::new(db.db().clone()),
            monthly: MonthlySalesRepository::new(db.db().clone()),
            cache,
            config,
        }
    }

    /// Monthly-needed figure for one (product, store) pair, with the
    /// default window and no forced refresh
    pub async fn get_monthly_sales(&self, product_number: i64, store_code: &str) -> AppResult<u32> {
        self.get_monthly_sales_opts(product_number, store_code, self.config.window_days, false)
            .await
    }

    /// Monthly-needed figure for one (product, store) pair.
    ///
    /// Tier 1: fast cache (TTL-bounded). Tier 2: persisted row younger
    /// than the staleness threshold, which backfills tier 1. Tier 3: live
    /// receipt scan for this product across all active stores, persisted
    /// for every store observed. `force_refresh` skips straight to tier 3.
    /// When the live scan fails and a persisted row exists — however old —
    /// the stale value is served rather than an error.
    pub async fn get_monthly_sales_opts(
        &self,
        product_number: i64,
        store_code: &str,
        days: u32,
        force_refresh: bool,
    ) -> AppResult<u32> {
        let key = cache::monthly_sales_key(product_number, store_code);
        if !force_refresh {
            if let Some(value) = self.cache.get(&key).await {
                if let Ok(value) = value.parse::<u32>() {
                    return Ok(value);
                }
                self.cache.delete(&key).await;
            }
        }

        let persisted = self.monthly.get(product_number, store_code).await?;
        if !force_refresh {
            if let Some(row) = &persisted {
                if !row.is_stale(self.config.stale_after) {
                    self.cache_value(&key, row.monthly_needed).await;
                    return Ok(row.monthly_needed);
                }
            }
        }

        match self.recompute_product(product_number, store_code, days).await {
            Ok(value) => Ok(value),
            Err(err) => match persisted {
                Some(row) => {
                    tracing::warn!(
                        product_number,
                        store_code,
                        "live sales scan failed, serving stale value: {err}"
                    );
                    Ok(row.monthly_needed)
                }
                None => Err(err),
            },
        }
    }

    /// Monthly-needed figures for one product across a store set (all
    /// active stores when `store_codes` is `None`).
    ///
    /// Pairs already answered by tier 1 or a fresh tier-2 row cost
    /// nothing; the remaining pairs share a single receipt scan. When
    /// that scan fails, each missing pair falls back to its stale
    /// persisted row; pairs with no fallback are omitted from the map
    /// rather than failing the whole call.
    pub async fn get_monthly_sales_many(
        &self,
        product_number: i64,
        store_codes: Option<Vec<String>>,
        days: u32,
        force_refresh: bool,
    ) -> AppResult<HashMap<String, u32>> {
        let active = self.stores.find_active().await?;
        let targets: Vec<Store> = match &store_codes {
            Some(codes) => active
                .into_iter()
                .filter(|s| codes.contains(&s.code))
                .collect(),
            None => active,
        };
        if targets.is_empty() {
            return Err(AppError::not_found("no matching active stores"));
        }

        let mut answers: HashMap<String, u32> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();

        for store in &targets {
            if force_refresh {
                missing.push(store.code.clone());
                continue;
            }
            let key = cache::monthly_sales_key(product_number, &store.code);
            if let Some(value) = self.cache.get(&key).await {
                if let Ok(value) = value.parse::<u32>() {
                    answers.insert(store.code.clone(), value);
                    continue;
                }
                self.cache.delete(&key).await;
            }
            match self.monthly.get(product_number, &store.code).await? {
                Some(row) if !row.is_stale(self.config.stale_after) => {
                    self.cache_value(&key, row.monthly_needed).await;
                    answers.insert(store.code.clone(), row.monthly_needed);
                }
                _ => missing.push(store.code.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(answers);
        }

        match self.compute_for_all_stores(product_number, days).await {
            Ok(computed) => {
                for code in &missing {
                    if let Some(value) = computed.get(code) {
                        answers.insert(code.clone(), *value);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    product_number,
                    pairs = missing.len(),
                    "live sales scan failed, falling back per store: {err}"
                );
                for code in &missing {
                    if let Some(row) = self.monthly.get(product_number, code).await? {
                        answers.insert(code.clone(), row.monthly_needed);
                    }
                }
            }
        }
        Ok(answers)
    }

    /// Live scan for one product; persists a row for every active store
    /// so sibling lookups land in tier 2, and returns the requested
    /// store's value.
    async fn recompute_product(
        &self,
        product_number: i64,
        store_code: &str,
        days: u32,
    ) -> AppResult<u32> {
        let computed = self.compute_for_all_stores(product_number, days).await?;
        computed
            .get(store_code)
            .copied()
            .ok_or_else(|| AppError::not_found(format!("store {store_code}")))
    }

    /// One receipt scan for one product, written through both tiers for
    /// every active store
    async fn compute_for_all_stores(
        &self,
        product_number: i64,
        days: u32,
    ) -> AppResult<HashMap<String, u32>> {
        let product = self
            .products
            .find_by_number(product_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("product {product_number}")))?;
        let pos_id = product.pos_id.ok_or_else(|| {
            AppError::validation(format!("product {product_number} has no POS id"))
        })?;

        let stores = self.stores.find_active().await?;
        let window = SalesWindow::last_days(days);
        let aggregate = self
            .client
            .aggregate_sales(&window, &SalesQuery::for_product(pos_id))
            .await?;

        let mut answers = HashMap::with_capacity(stores.len());
        let mut rows = Vec::with_capacity(stores.len());
        for store in &stores {
            let total = aggregate
                .get(&store.pos_id)
                .and_then(|products| products.get(&pos_id))
                .copied()
                .unwrap_or(Decimal::ZERO);
            let row = MonthlySales::from_window(product_number, &store.code, total, window.days);
            self.cache_value(
                &cache::monthly_sales_key(product_number, &store.code),
                row.monthly_needed,
            )
            .await;
            answers.insert(store.code.clone(), row.monthly_needed);
            rows.push(row);
        }
        self.monthly.upsert_many(rows).await?;
        Ok(answers)
    }

    /// Recompute monthly sales for the whole catalog with one receipt
    /// scan, persisting a row per (product, active store) pair and
    /// repopulating the fast cache.
    pub async fn warm_all(&self) -> AppResult<WarmReport> {
        let products = self.products.find_syncable(None, None).await?;
        let all_products = self.products.find_all().await?;
        let stores = self.stores.find_active().await?;

        let mut report = WarmReport {
            products: products.len(),
            stores: stores.len(),
            skipped: all_products.len() - products.len(),
            ..Default::default()
        };

        let window = SalesWindow::last_days(self.config.window_days);
        let aggregate = self
            .client
            .aggregate_sales(&window, &SalesQuery::all())
            .await?;

        // Per-store totals come keyed by POS uuid; flip to business keys
        let known: HashMap<Uuid, i64> = products
            .iter()
            .filter_map(|p| p.pos_id.map(|id| (id, p.number)))
            .collect();

        self.cache.delete_prefix("monthly_sales:").await;

        let mut batch: Vec<MonthlySales> = Vec::with_capacity(UPSERT_CHUNK);
        for product in &products {
            let Some(pos_id) = product.pos_id else { continue };
            for store in &stores {
                let total = aggregate
                    .get(&store.pos_id)
                    .and_then(|totals| totals.get(&pos_id))
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let row = MonthlySales::from_window(product.number, &store.code, total, window.days);
                self.cache_value(
                    &cache::monthly_sales_key(product.number, &store.code),
                    row.monthly_needed,
                )
                .await;
                batch.push(row);

                if batch.len() >= UPSERT_CHUNK {
                    report.rows_written += self.monthly.upsert_many(std::mem::take(&mut batch)).await?;
                }
            }
        }
        report.rows_written += self.monthly.upsert_many(batch).await?;

        // The aggregate may reference products the catalog sync has not
        // seen yet; they get a row on their first individual lookup.
        let unknown = aggregate
            .values()
            .flat_map(|totals| totals.keys())
            .filter(|id| !known.contains_key(id))
            .count();
        if unknown > 0 {
            tracing::debug!(unknown, "receipt scan referenced products not in the catalog");
        }

        tracing::info!(
            products = report.products,
            stores = report.stores,
            rows = report.rows_written,
            "monthly sales warmed"
        );
        Ok(report)
    }

    async fn cache_value(&self, key: &str, value: u32) {
        self.cache
            .set(key, value.to_string(), Some(self.config.fast_ttl))
            .await;
    }
}

//! Store and catalog sync passes

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use pos_client::{OrgUnitRecord, PosClient, ProductRecord};

use crate::core::error::AppResult;
use crate::db::DbService;
use crate::db::models::{Product, Store};
use crate::db::repository::{ProductRepository, StoreRepository};

/// Counts from one sync pass
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    /// Records the API returned
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    /// Records identical to what is already stored; no write happened
    pub unchanged: usize,
    /// Records too malformed to store (missing id or business number)
    pub skipped: usize,
    /// Stores marked inactive because the API no longer lists them
    pub deactivated: usize,
    /// The listing hit the pagination cap; it may be incomplete
    pub truncated: bool,
}

/// Pulls stores and the product catalog from the POS API into the local
/// database. Both passes are idempotent: re-running against unchanged
/// upstream data writes nothing.
#[derive(Clone)]
pub struct SyncService {
    client: Arc<PosClient>,
    stores: StoreRepository,
    products: ProductRepository,
}

impl SyncService {
    pub fn new(client: Arc<PosClient>, db: &DbService) -> Self {
        Self {
            client,
            stores: StoreRepository::new(db.db().clone()),
            products: ProductRepository::new(db.db().clone()),
        }
    }

    pub fn stores(&self) -> &StoreRepository {
        &self.stores
    }

    pub fn products(&self) -> &ProductRepository {
        &self.products
    }

    /// Mirror organizational units into local stores.
    ///
    /// Stores absent from the listing are deactivated, never deleted —
    /// unless the listing was truncated, in which case absence proves
    /// nothing and deactivation is skipped.
    pub async fn sync_stores(&self) -> AppResult<SyncReport> {
        let listing = self
            .client
            .fetch_all::<OrgUnitRecord>("organizationalUnits", &[])
            .await?;

        let mut report = SyncReport {
            fetched: listing.items.len(),
            truncated: listing.truncated,
            ..Default::default()
        };
        let mut seen: Vec<Uuid> = Vec::with_capacity(listing.items.len());

        for record in &listing.items {
            let store = match Store::from_wire(record) {
                Ok(store) => store,
                Err(err) => {
                    tracing::warn!(number = ?record.number, "skipping store record: {err}");
                    report.skipped += 1;
                    continue;
                }
            };
            seen.push(store.pos_id);

            match self.stores.find_by_pos_id(store.pos_id).await? {
                Some(existing) if existing.same_as(&store) => report.unchanged += 1,
                Some(_) => {
                    self.stores.upsert(store).await?;
                    report.updated += 1;
                }
                None => {
                    self.stores.upsert(store).await?;
                    report.created += 1;
                }
            }
        }

        if !report.truncated {
            let deactivated = self.stores.deactivate_missing(seen).await?;
            if !deactivated.is_empty() {
                tracing::info!(codes = ?deactivated, "deactivated stores missing upstream");
            }
            report.deactivated = deactivated.len();
        }

        tracing::info!(
            fetched = report.fetched,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            deactivated = report.deactivated,
            "store sync complete"
        );
        Ok(report)
    }

    /// Mirror the product catalog into local products.
    ///
    /// Products without a usable numeric business number are counted and
    /// skipped. Nothing is ever deleted here: a product gone from the
    /// catalog keeps its local record and history.
    pub async fn sync_catalog(&self) -> AppResult<SyncReport> {
        let listing = self.client.fetch_all::<ProductRecord>("products", &[]).await?;

        let mut report = SyncReport {
            fetched: listing.items.len(),
            truncated: listing.truncated,
            ..Default::default()
        };

        for record in &listing.items {
            let product = match Product::from_wire(record) {
                Ok(product) => product,
                Err(err) => {
                    tracing::warn!(name = ?record.name, "skipping product record: {err}");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.products.find_by_number(product.number).await? {
                Some(existing) if existing.same_as(&product) => report.unchanged += 1,
                Some(_) => {
                    self.products.upsert(product).await?;
                    report.updated += 1;
                }
                None => {
                    self.products.upsert(product).await?;
                    report.created += 1;
                }
            }
        }

        tracing::info!(
            fetched = report.fetched,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            truncated = report.truncated,
            "catalog sync complete"
        );
        Ok(report)
    }
}

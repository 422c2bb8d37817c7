//! Receipt aggregation — per-store per-product sales totals
//!
//! Scans every transaction receipt in a date window exactly once and
//! accumulates sold quantities per (store, product) pair with exact decimal
//! arithmetic. One scan loop serves all three entry points (single product,
//! product across a store set, full catalog): they only differ in the
//! [`SalesQuery`] filter, so a bulk query never pays for N redundant
//! full-window scans.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::client::PosClient;
use crate::error::{ClientError, ClientResult};
use crate::types::{PageEnvelope, ReceiptRecord};

/// Page size for receipt scans
const RECEIPT_PAGE_SIZE: u32 = 100;

/// Booking-time window offset. Carried over verbatim from the upstream
/// system; stores outside this offset or DST transitions may shift a
/// receipt across a day boundary (see DESIGN.md).
const WINDOW_OFFSET: &str = "-07:00";

/// Aggregated quantities: store id -> product id -> total quantity sold
pub type SalesAggregate = HashMap<Uuid, HashMap<Uuid, Decimal>>;

/// Date window for a receipt scan, closed on day boundaries:
/// `[start 00:00:00, end 23:59:59]` at a fixed UTC offset.
#[derive(Debug, Clone)]
pub struct SalesWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

impl SalesWindow {
    /// Window covering the last `days` days, ending now
    pub fn last_days(days: u32) -> Self {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(days.max(1)));
        Self {
            start,
            end,
            days: days.max(1),
        }
    }

    /// `minBookingTime` query value
    pub fn min_booking_time(&self) -> String {
        format!("{}T00:00:00{WINDOW_OFFSET}", self.start.format("%Y-%m-%d"))
    }

    /// `maxBookingTime` query value
    pub fn max_booking_time(&self) -> String {
        format!("{}T23:59:59{WINDOW_OFFSET}", self.end.format("%Y-%m-%d"))
    }
}

/// Filter applied while accumulating a receipt scan
#[derive(Debug, Clone, Default)]
pub struct SalesQuery {
    /// Only count line items for this product
    pub product: Option<Uuid>,
    /// Only count receipts booked at these stores
    pub stores: Option<HashSet<Uuid>>,
}

impl SalesQuery {
    /// Full aggregate: all products, all stores
    pub fn all() -> Self {
        Self::default()
    }

    /// One product across every store
    pub fn for_product(product: Uuid) -> Self {
        Self {
            product: Some(product),
            stores: None,
        }
    }

    /// One product across a specific store set
    pub fn for_product_at_stores(product: Uuid, stores: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            product: Some(product),
            stores: Some(stores.into_iter().collect()),
        }
    }
}

/// Fold one receipt into the running aggregate.
///
/// Voided/cancelled receipts and receipts without an organizational unit
/// contribute nothing; only positive quantities count (a return is not a
/// unit sold).
fn accumulate(receipt: &ReceiptRecord, query: &SalesQuery, aggregate: &mut SalesAggregate) {
    if receipt.voided || receipt.cancelled {
        return;
    }
    let Some(store_id) = receipt.store_id() else {
        return;
    };
    if let Some(stores) = &query.stores
        && !stores.contains(&store_id)
    {
        return;
    }

    for item in &receipt.items {
        let Some(product_id) = item.product_id() else {
            continue;
        };
        if let Some(wanted) = query.product
            && product_id != wanted
        {
            continue;
        }
        if item.quantity > Decimal::ZERO {
            *aggregate
                .entry(store_id)
                .or_default()
                .entry(product_id)
                .or_insert(Decimal::ZERO) += item.quantity;
        }
    }
}

impl PosClient {
    /// Scan every receipt in `window` once and aggregate sold quantities.
    ///
    /// Pages are fetched strictly in increasing order and the scan
    /// terminates on the server-reported page total — no safety cap, the
    /// window bounds the work. Any request failure aborts the whole scan:
    /// a partially observed window cannot be trusted. The scan also
    /// carries a wall-clock budget (`scan_budget`) so a pathological
    /// window cannot run unbounded.
    pub async fn aggregate_sales(
        &self,
        window: &SalesWindow,
        query: &SalesQuery,
    ) -> ClientResult<SalesAggregate> {
        let deadline = Instant::now() + self.config().scan_budget;
        let min_time = window.min_booking_time();
        let max_time = window.max_booking_time();

        let mut aggregate = SalesAggregate::new();
        let mut page: u32 = 1;
        let mut receipts_seen: usize = 0;

        loop {
            if Instant::now() >= deadline {
                tracing::error!(page, "receipt scan exceeded its time budget, aborting");
                return Err(ClientError::ScanBudget);
            }

            let params: Vec<(String, String)> = vec![
                ("minBookingTime".into(), min_time.clone()),
                ("maxBookingTime".into(), max_time.clone()),
                ("page".into(), page.to_string()),
                ("size".into(), RECEIPT_PAGE_SIZE.to_string()),
            ];

            let envelope: PageEnvelope<ReceiptRecord> = self
                .get_json("receipts", &params, self.config().receipt_read_timeout)
                .await?;

            if envelope.results.is_empty() {
                break;
            }
            receipts_seen += envelope.results.len();

            for receipt in &envelope.results {
                accumulate(receipt, query, &mut aggregate);
            }

            if page >= envelope.pages_total.unwrap_or(1) {
                break;
            }
            page += 1;
        }

        tracing::info!(
            receipts = receipts_seen,
            pages = page,
            stores = aggregate.len(),
            "receipt scan complete ({} to {})",
            min_time,
            max_time,
        );
        Ok(aggregate)
    }
}

/// Extrapolated 30-day demand from a shorter observed window:
/// `max(1, round_half_up(total / days * 30))` for any positive total.
///
/// The floor of 1 is policy: a product with recorded sales activity needs
/// at least one unit a month even when the average rounds to zero.
pub fn monthly_needed(total: Decimal, days: u32) -> u32 {
    if total <= Decimal::ZERO {
        return 0;
    }
    let monthly = (total / Decimal::from(days.max(1)) * Decimal::from(30))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    monthly.to_u32().unwrap_or(u32::MAX).max(1)
}

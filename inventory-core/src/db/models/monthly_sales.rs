//! Rolling-window sales figure for a (product, store) pair

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use pos_client::monthly_needed;

pub const MONTHLY_SALES_TABLE: &str = "monthly_sales";

/// Persisted sales figure for one (product, store) pair.
///
/// Stores both the raw observation (`quantity_sold` over `days`) and the
/// derived `monthly_needed`, so the extrapolation can be re-audited later.
/// `calculated_at` drives the staleness check: the sales service serves a
/// row younger than the configured threshold directly, and uses older rows
/// only as a fallback when a live recomputation fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    #[serde(skip_serializing, default)]
    pub id: Option<RecordId>,
    pub product_number: i64,
    pub store_code: String,
    pub quantity_sold: Decimal,
    pub days: u32,
    pub monthly_needed: u32,
    pub calculated_at: DateTime<Utc>,
}

impl MonthlySales {
    pub fn key(product_number: i64, store_code: &str) -> String {
        format!("{product_number}_{store_code}")
    }

    pub fn record_id(&self) -> RecordId {
        RecordId::from_table_key(
            MONTHLY_SALES_TABLE,
            Self::key(self.product_number, &self.store_code),
        )
    }

    /// Build a row from an observed window, deriving the monthly figure
    pub fn from_window(
        product_number: i64,
        store_code: &str,
        quantity_sold: Decimal,
        days: u32,
    ) -> Self {
        Self {
            id: None,
            product_number,
            store_code: store_code.to_string(),
            quantity_sold,
            days,
            monthly_needed: monthly_needed(quantity_sold, days),
            calculated_at: Utc::now(),
        }
    }

    /// Whether this row is older than `threshold`
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        let age = Utc::now() - self.calculated_at;
        age > Duration::from_std(threshold).unwrap_or(Duration::MAX)
    }
}

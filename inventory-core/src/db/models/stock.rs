//! Per-store stock snapshot for a product

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use pos_client::StockLevelRecord;

pub const STOCK_TABLE: &str = "product_stock";

/// Last known stock numbers for one (product, store) pair.
///
/// `cached` marks a row served from persistence after a live lookup
/// failed, so callers can tell fresh data from fallback data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStock {
    #[serde(skip_serializing, default)]
    pub id: Option<RecordId>,
    pub product_number: i64,
    pub store_code: String,
    pub actual: Decimal,
    pub lent: Decimal,
    pub max_level: Decimal,
    pub ordered: Decimal,
    pub reorder_level: Decimal,
    pub average_purchase_price: Decimal,
    pub listed: bool,
    #[serde(default)]
    pub cached: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProductStock {
    /// Composite record key; one row per (product, store) pair
    pub fn key(product_number: i64, store_code: &str) -> String {
        format!("{product_number}_{store_code}")
    }

    pub fn record_id(&self) -> RecordId {
        RecordId::from_table_key(STOCK_TABLE, Self::key(self.product_number, &self.store_code))
    }

    pub fn from_wire(record: &StockLevelRecord, product_number: i64, store_code: &str) -> Self {
        Self {
            id: None,
            product_number,
            store_code: store_code.to_string(),
            actual: record.amount.actual,
            lent: record.amount.lent,
            max_level: record.amount.max_level,
            ordered: record.amount.ordered,
            reorder_level: record.amount.reorder_level,
            average_purchase_price: record.average_purchase_price,
            listed: record.listed,
            cached: false,
            updated_at: Utc::now(),
        }
    }

    /// Field-level equality ignoring the record id and timestamps, used to
    /// detect no-op upserts
    pub fn same_as(&self, other: &ProductStock) -> bool {
        self.product_number == other.product_number
            && self.store_code == other.store_code
            && self.actual == other.actual
            && self.lent == other.lent
            && self.max_level == other.max_level
            && self.ordered == other.ordered
            && self.reorder_level == other.reorder_level
            && self.average_purchase_price == other.average_purchase_price
            && self.listed == other.listed
    }
}

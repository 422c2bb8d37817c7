//! Product model — one catalog entry

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use uuid::Uuid;

use pos_client::{ClientError, ProductRecord};

pub const PRODUCT_TABLE: &str = "product";

/// A catalog product.
///
/// Identity is the numeric business `number` printed on labels; the POS
/// external id (`pos_id`) is carried alongside because stock and receipt
/// payloads reference products by uuid, not by number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip_serializing, default)]
    pub id: Option<RecordId>,
    pub number: i64,
    pub pos_id: Option<Uuid>,
    pub name: String,
    pub barcode: String,
    #[serde(default)]
    pub extra_barcodes: Vec<String>,
    #[serde(default)]
    pub supplier: String,
}

impl Product {
    pub fn record_id(&self) -> RecordId {
        RecordId::from_table_key(PRODUCT_TABLE, self.number)
    }

    /// Normalize a wire record into a local product.
    ///
    /// Products without a usable numeric business number cannot be keyed
    /// locally; the catalog sync counts and skips them.
    pub fn from_wire(record: &ProductRecord) -> Result<Self, ClientError> {
        let number = record.number_as_i64()?;
        Ok(Self {
            id: None,
            number,
            pos_id: record.pos_id(),
            name: record.name.as_deref().map(str::trim).unwrap_or_default().to_string(),
            barcode: record.primary_barcode(),
            extra_barcodes: record.extra_barcodes(),
            supplier: record.supplier_name(),
        })
    }

    /// Field-level equality ignoring the record id
    pub fn same_as(&self, other: &Product) -> bool {
        let mut mine = self.clone();
        let mut theirs = other.clone();
        mine.id = None;
        theirs.id = None;
        mine == theirs
    }
}

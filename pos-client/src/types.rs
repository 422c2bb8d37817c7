//! Typed wire records for POS API payloads
//!
//! One struct per external payload shape, replacing duck-typed JSON
//! traversal with an explicit parse step: a missing or wrong-typed field is
//! a single well-defined data error the sync passes can count and skip.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;

/// Standard paginated list envelope.
///
/// `pagesTotal` comes in the response body, not headers, and is absent when
/// the request passed `omitPageCounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(rename = "pagesTotal")]
    pub pages_total: Option<u32>,
}

// =============================================================================
// Catalog
// =============================================================================

/// One entry of a product's `codes` list
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCodeRecord {
    #[serde(rename = "productCode")]
    pub product_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplierRecord {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplierPriceRecord {
    pub supplier: Option<SupplierRecord>,
}

/// Product record from `GET /accounts/{account}/products`
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    pub id: Option<String>,
    /// The stable business identifier; the API is loose about its type
    /// (number or string), so it is normalized through [`Self::number_as_i64`].
    pub number: Option<serde_json::Value>,
    pub name: Option<String>,
    #[serde(default)]
    pub codes: Vec<ProductCodeRecord>,
    #[serde(rename = "supplierPrices", default)]
    pub supplier_prices: Vec<SupplierPriceRecord>,
}

impl ProductRecord {
    /// Normalize the business number to i64.
    ///
    /// Products with a missing or non-numeric number cannot be stored
    /// locally and are skipped by the catalog sync.
    pub fn number_as_i64(&self) -> Result<i64, ClientError> {
        match &self.number {
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| ClientError::InvalidPayload(format!("product number {n} not an integer"))),
            Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
                ClientError::InvalidPayload(format!("product number {s:?} not numeric"))
            }),
            other => Err(ClientError::InvalidPayload(format!(
                "product number missing or wrong-typed: {other:?}"
            ))),
        }
    }

    /// Parsed external id, when present and well-formed
    pub fn pos_id(&self) -> Option<Uuid> {
        self.id.as_deref().and_then(|s| Uuid::parse_str(s).ok())
    }

    /// First barcode, normalized
    pub fn primary_barcode(&self) -> String {
        self.codes
            .first()
            .and_then(|c| c.product_code.as_deref())
            .map(|c| c.trim().to_string())
            .unwrap_or_default()
    }

    /// Additional barcodes beyond the first, deduplicated
    pub fn extra_barcodes(&self) -> Vec<String> {
        let primary = self.primary_barcode();
        let mut seen = vec![];
        for code in self.codes.iter().skip(1) {
            if let Some(code) = code.product_code.as_deref() {
                let code = code.trim().to_string();
                if !code.is_empty() && code != primary && !seen.contains(&code) {
                    seen.push(code);
                }
            }
        }
        seen
    }

    /// First supplier with a non-empty name
    pub fn supplier_name(&self) -> String {
        self.supplier_prices
            .iter()
            .filter_map(|entry| entry.supplier.as_ref())
            .filter_map(|supplier| supplier.name.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

// =============================================================================
// Organizational units (stores)
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressRecord {
    #[serde(rename = "addressLine1")]
    pub address_line1: Option<String>,
    #[serde(rename = "addressLine2")]
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "zipCode")]
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub company: Option<String>,
}

/// Store record from `GET /accounts/{account}/organizationalUnits`
#[derive(Debug, Clone, Deserialize)]
pub struct OrgUnitRecord {
    pub id: Option<String>,
    pub number: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub address: AddressRecord,
    pub active: Option<bool>,
    pub warehouse: Option<bool>,
}

impl OrgUnitRecord {
    /// Parse the external id; absent or malformed ids make the record
    /// unusable for a sync pass.
    pub fn pos_id(&self) -> Result<Uuid, ClientError> {
        let raw = self
            .id
            .as_deref()
            .ok_or_else(|| ClientError::InvalidPayload("organizational unit without id".into()))?;
        Uuid::parse_str(raw)
            .map_err(|_| ClientError::InvalidPayload(format!("invalid organizational unit id {raw:?}")))
    }
}

// =============================================================================
// Stock levels
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseRef {
    pub id: Option<String>,
}

/// Quantity block of a stock-level entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AmountRecord {
    #[serde(default)]
    pub actual: Decimal,
    #[serde(default)]
    pub lent: Decimal,
    #[serde(rename = "maxLevel", default)]
    pub max_level: Decimal,
    #[serde(default)]
    pub ordered: Decimal,
    #[serde(rename = "reorderLevel", default)]
    pub reorder_level: Decimal,
}

/// One per-warehouse entry from `GET /accounts/{account}/products/{id}/stocks`
#[derive(Debug, Clone, Deserialize)]
pub struct StockLevelRecord {
    pub warehouse: Option<WarehouseRef>,
    #[serde(default)]
    pub amount: AmountRecord,
    #[serde(rename = "averagePurchasePrice", default)]
    pub average_purchase_price: Decimal,
    #[serde(default)]
    pub listed: bool,
}

impl StockLevelRecord {
    /// The warehouse's external id, when present and well-formed
    pub fn warehouse_id(&self) -> Option<Uuid> {
        self.warehouse
            .as_ref()
            .and_then(|w| w.id.as_deref())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

// =============================================================================
// Receipts
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRef {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgUnitRef {
    pub id: Option<String>,
}

/// One product-quantity line within a receipt
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptItemRecord {
    pub product: Option<ProductRef>,
    #[serde(default)]
    pub quantity: Decimal,
}

impl ReceiptItemRecord {
    pub fn product_id(&self) -> Option<Uuid> {
        self.product
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

/// Transaction receipt from `GET /accounts/{account}/receipts`
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptRecord {
    pub number: Option<String>,
    #[serde(rename = "bookingTime")]
    pub booking_time: Option<String>,
    #[serde(default)]
    pub voided: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(rename = "organizationalUnit")]
    pub organizational_unit: Option<OrgUnitRef>,
    #[serde(default)]
    pub items: Vec<ReceiptItemRecord>,
}

impl ReceiptRecord {
    /// The store this receipt belongs to; receipts without one are skipped
    pub fn store_id(&self) -> Option<Uuid> {
        self.organizational_unit
            .as_ref()
            .and_then(|unit| unit.id.as_deref())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

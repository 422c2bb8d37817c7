//! Store model — one POS organizational unit

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use uuid::Uuid;

use pos_client::{ClientError, OrgUnitRecord};

pub const STORE_TABLE: &str = "store";

/// A store/warehouse location known to the POS account.
///
/// Identity is the POS external id; `code` is the local business code
/// callers use to address the store. Stores are never deleted — a store
/// absent from a sync response is marked inactive, since historical order
/// lists keep referencing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(skip_serializing, default)]
    pub id: Option<RecordId>,
    pub pos_id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub company: String,
    pub active: bool,
    pub is_warehouse: bool,
}

impl Store {
    pub fn record_id(&self) -> RecordId {
        RecordId::from_table_key(STORE_TABLE, self.pos_id.to_string())
    }

    /// Normalize a wire record into a local store.
    ///
    /// Fails only when the external id is missing or malformed; every
    /// other field degrades to an empty default.
    pub fn from_wire(record: &OrgUnitRecord) -> Result<Self, ClientError> {
        let pos_id = record.pos_id()?;
        let trimmed = |value: &Option<String>| {
            value.as_deref().map(str::trim).unwrap_or_default().to_string()
        };
        Ok(Self {
            id: None,
            pos_id,
            code: trimmed(&record.number),
            name: trimmed(&record.name),
            address_line1: trimmed(&record.address.address_line1),
            address_line2: trimmed(&record.address.address_line2),
            city: trimmed(&record.address.city),
            state: trimmed(&record.address.state),
            zip_code: trimmed(&record.address.zip_code),
            country: trimmed(&record.address.country),
            company: trimmed(&record.address.company),
            active: record.active.unwrap_or(true),
            is_warehouse: record.warehouse.unwrap_or(false),
        })
    }

    /// Field-level equality ignoring the record id, used by the sync pass
    /// to detect no-op upserts
    pub fn same_as(&self, other: &Store) -> bool {
        let mut mine = self.clone();
        let mut theirs = other.clone();
        mine.id = None;
        theirs.id = None;
        mine == theirs
    }
}

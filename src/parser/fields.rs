use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic keys a decoded label can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    MfgPn,
    Manufacturer,
    Traceability,
    Coo,
    Product,
    Qty,
    Serial,
    DateCode,
    Distributor,
    OrderNo,
    LineNo,
    InvoiceNo,
    Pick,
    PartId,
    LoadId,
    Signature,
    Unknown,
}

impl FieldKey {
    pub const ALL: [FieldKey; 17] = [
        FieldKey::MfgPn,
        FieldKey::Manufacturer,
        FieldKey::Traceability,
        FieldKey::Coo,
        FieldKey::Product,
        FieldKey::Qty,
        FieldKey::Serial,
        FieldKey::DateCode,
        FieldKey::Distributor,
        FieldKey::OrderNo,
        FieldKey::LineNo,
        FieldKey::InvoiceNo,
        FieldKey::Pick,
        FieldKey::PartId,
        FieldKey::LoadId,
        FieldKey::Signature,
        FieldKey::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::MfgPn => "mfg_pn",
            FieldKey::Manufacturer => "manufacturer",
            FieldKey::Traceability => "traceability",
            FieldKey::Coo => "coo",
            FieldKey::Product => "product",
            FieldKey::Qty => "qty",
            FieldKey::Serial => "serial",
            FieldKey::DateCode => "date_code",
            FieldKey::Distributor => "distributor",
            FieldKey::OrderNo => "order_no",
            FieldKey::LineNo => "line_no",
            FieldKey::InvoiceNo => "invoice_no",
            FieldKey::Pick => "pick",
            FieldKey::PartId => "part_id",
            FieldKey::LoadId => "load_id",
            FieldKey::Signature => "signature",
            FieldKey::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded label fields, one slot per key.
///
/// Serializes as a flat JSON object containing only the populated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfg_pn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<String>,
}

impl ScanFields {
    fn slot(&self, key: FieldKey) -> &Option<String> {
        match key {
            FieldKey::MfgPn => &self.mfg_pn,
            FieldKey::Manufacturer => &self.manufacturer,
            FieldKey::Traceability => &self.traceability,
            FieldKey::Coo => &self.coo,
            FieldKey::Product => &self.product,
            FieldKey::Qty => &self.qty,
            FieldKey::Serial => &self.serial,
            FieldKey::DateCode => &self.date_code,
            FieldKey::Distributor => &self.distributor,
            FieldKey::OrderNo => &self.order_no,
            FieldKey::LineNo => &self.line_no,
            FieldKey::InvoiceNo => &self.invoice_no,
            FieldKey::Pick => &self.pick,
            FieldKey::PartId => &self.part_id,
            FieldKey::LoadId => &self.load_id,
            FieldKey::Signature => &self.signature,
            FieldKey::Unknown => &self.unknown,
        }
    }

    fn slot_mut(&mut self, key: FieldKey) -> &mut Option<String> {
        match key {
            FieldKey::MfgPn => &mut self.mfg_pn,
            FieldKey::Manufacturer => &mut self.manufacturer,
            FieldKey::Traceability => &mut self.traceability,
            FieldKey::Coo => &mut self.coo,
            FieldKey::Product => &mut self.product,
            FieldKey::Qty => &mut self.qty,
            FieldKey::Serial => &mut self.serial,
            FieldKey::DateCode => &mut self.date_code,
            FieldKey::Distributor => &mut self.distributor,
            FieldKey::OrderNo => &mut self.order_no,
            FieldKey::LineNo => &mut self.line_no,
            FieldKey::InvoiceNo => &mut self.invoice_no,
            FieldKey::Pick => &mut self.pick,
            FieldKey::PartId => &mut self.part_id,
            FieldKey::LoadId => &mut self.load_id,
            FieldKey::Signature => &mut self.signature,
            FieldKey::Unknown => &mut self.unknown,
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    /// Store a value. `Unknown` is always overwritten; any other key keeps its
    /// first value and later writes are rejected (returns false).
    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) -> bool {
        let slot = self.slot_mut(key);
        if key != FieldKey::Unknown && slot.is_some() {
            return false;
        }
        *slot = Some(value.into());
        true
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.slot(key).is_some()
    }

    /// Populated fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> + '_ {
        FieldKey::ALL
            .iter()
            .filter_map(move |key| self.get(*key).map(|value| (*key, value)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

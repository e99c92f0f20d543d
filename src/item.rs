//! The line-item data model.
//!
//! A scanned cost estimate is a table with three levels of heading context
//! (unit, room, work category) above rows of serial / description / qty /
//! uom plus six numeric cost columns. Every extracted row becomes a
//! [`LineItem`] with exactly 13 string fields, always present:
//!
//! * blank numeric cells are `"0"`, never a missing key;
//! * absent unit/room/category headings are `"unknown"` until the carry
//!   context fills them in.
//!
//! Everything stays a string: values are transcribed as printed (including
//! thousands commas) and no numeric conversion happens outside the shift
//! detector's lenient reads.
//!
//! Serialization order is the declaration order below, which is also the
//! left-to-right column order on the printed page. Downstream consumers
//! diff these documents textually, so the key order is part of the
//! contract.

use serde::{Deserialize, Serialize};

/// Sentinel for blank numeric cells.
pub const BLANK_NUMERIC: &str = "0";

/// Sentinel for absent unit/room/category headings.
pub const UNKNOWN: &str = "unknown";

/// One extracted table row. All 13 fields are required strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unit heading the row falls under, e.g. `"Unit 1101"`.
    pub unit: String,
    /// Room heading beneath the unit, e.g. `"Kitchen"`.
    pub room: String,
    /// Underlined work-category heading, e.g. `"DRYWALL"`.
    pub category: String,
    /// Row serial number as printed (may contain thousands commas).
    pub serial: String,
    /// Work description; may have wrapped across physical lines.
    pub description: String,
    /// Quantity as printed.
    pub qty: String,
    /// Unit of measure: EA, SF, LF, ...
    pub uom: String,
    /// RESET cost column.
    pub reset: String,
    /// REMOVE cost column.
    pub remove: String,
    /// REPLACE cost column.
    pub replace: String,
    /// TAX cost column.
    pub tax: String,
    /// O&P (overhead and profit) cost column.
    pub oandp: String,
    /// TOTAL cost column.
    pub total: String,
}

impl LineItem {
    /// Field names in serialization (and printed-column) order.
    pub const FIELD_NAMES: [&'static str; 13] = [
        "unit",
        "room",
        "category",
        "serial",
        "description",
        "qty",
        "uom",
        "reset",
        "remove",
        "replace",
        "tax",
        "oandp",
        "total",
    ];
}

/// The aggregated output document: `{"items": [...]}`.
///
/// Items appear in extraction order: chunks in page order, rows in reading
/// order within each chunk. A failed chunk simply contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateItems {
    pub items: Vec<LineItem>,
}

impl EstimateItems {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

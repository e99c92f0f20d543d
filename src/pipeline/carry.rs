//! Sticky heading context carried across items and chunks.
//!
//! On the printed page, a unit heading like "Unit 1101" appears once and
//! governs every row until the next heading, often across page (and
//! therefore chunk) boundaries; continuation pages may repeat nothing at
//! all. The model, seeing one chunk at a time, fills the `unit`, `room`,
//! and `category` fields with `"unknown"` whenever the heading is not
//! visible in its pages.
//!
//! [`CarryContext`] is that cross-chunk memory. The orchestrator owns a
//! single instance for the whole run and applies it to every item in
//! document order, which is why chunk processing must stay sequential.
//! A failed chunk never touches the context: its items are discarded
//! before any of them could update it.

use tracing::debug;

use crate::item::{LineItem, UNKNOWN};

/// The sticky `{unit, room, category}` context.
///
/// Starts as `"unknown"` on every field; anything the document states
/// before its first heading inherits that sentinel unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarryContext {
    pub unit: String,
    pub room: String,
    pub category: String,
}

impl Default for CarryContext {
    fn default() -> Self {
        CarryContext {
            unit: UNKNOWN.to_string(),
            room: UNKNOWN.to_string(),
            category: UNKNOWN.to_string(),
        }
    }
}

impl CarryContext {
    /// Resolve one item's heading fields against the context, in place.
    ///
    /// Per field: a missing value (trimmed empty, or `"unknown"` in any
    /// case) inherits the carried value; a present value is authoritative
    /// and becomes the new carried value.
    pub fn apply(&mut self, item: &mut LineItem) {
        inherit_or_update("unit", &mut self.unit, &mut item.unit);
        inherit_or_update("room", &mut self.room, &mut item.room);
        inherit_or_update("category", &mut self.category, &mut item.category);
    }
}

fn inherit_or_update(field: &str, carried: &mut String, value: &mut String) {
    if is_missing(value) {
        value.clone_from(carried);
    } else {
        if value != carried {
            debug!("carry context: {field} -> {value:?}");
        }
        carried.clone_from(value);
    }
}

fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_headings(unit: &str, room: &str, category: &str) -> LineItem {
        LineItem {
            unit: unit.into(),
            room: room.into(),
            category: category.into(),
            serial: "1".into(),
            description: "work".into(),
            qty: "1.00".into(),
            uom: "EA".into(),
            reset: "0".into(),
            remove: "0".into(),
            replace: "0".into(),
            tax: "0".into(),
            oandp: "0".into(),
            total: "0".into(),
        }
    }

    #[test]
    fn unknown_and_empty_inherit_the_last_heading() {
        let mut ctx = CarryContext::default();
        let mut items = vec![
            item_with_headings("Unit 1101", "Kitchen", "DRYWALL"),
            item_with_headings("unknown", "unknown", "unknown"),
            item_with_headings("", "", ""),
        ];
        for item in &mut items {
            ctx.apply(item);
        }
        for item in &items {
            assert_eq!(item.unit, "Unit 1101");
            assert_eq!(item.room, "Kitchen");
            assert_eq!(item.category, "DRYWALL");
        }
    }

    #[test]
    fn present_value_is_authoritative_and_updates_context() {
        let mut ctx = CarryContext::default();
        let mut first = item_with_headings("Unit 1101", "Kitchen", "DRYWALL");
        ctx.apply(&mut first);
        let mut second = item_with_headings("Unit 1102", "unknown", "PAINT");
        ctx.apply(&mut second);
        assert_eq!(second.unit, "Unit 1102");
        assert_eq!(second.room, "Kitchen");
        assert_eq!(second.category, "PAINT");
        assert_eq!(ctx.unit, "Unit 1102");
        assert_eq!(ctx.category, "PAINT");
    }

    #[test]
    fn unknown_is_case_insensitive_and_trimmed() {
        let mut ctx = CarryContext::default();
        ctx.apply(&mut item_with_headings("Unit 1101", "Bath", "TILE"));
        let mut item = item_with_headings("  Unknown ", "UNKNOWN", " unknown");
        ctx.apply(&mut item);
        assert_eq!(item.unit, "Unit 1101");
        assert_eq!(item.room, "Bath");
        assert_eq!(item.category, "TILE");
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut ctx = CarryContext::default();
        ctx.apply(&mut item_with_headings("Unit 1101", "Hall", "TRIM"));
        let mut item = item_with_headings("   ", "\t", "Hall Closet");
        ctx.apply(&mut item);
        assert_eq!(item.unit, "Unit 1101");
        assert_eq!(item.room, "Hall");
        assert_eq!(item.category, "Hall Closet");
    }

    #[test]
    fn before_any_heading_the_sentinel_is_carried() {
        let mut ctx = CarryContext::default();
        let mut item = item_with_headings("", "unknown", "");
        ctx.apply(&mut item);
        assert_eq!(item.unit, UNKNOWN);
        assert_eq!(item.room, UNKNOWN);
        assert_eq!(item.category, UNKNOWN);
    }

    #[test]
    fn fields_carry_independently() {
        let mut ctx = CarryContext::default();
        ctx.apply(&mut item_with_headings("Unit 1101", "Kitchen", "DRYWALL"));
        ctx.apply(&mut item_with_headings("unknown", "Living Room", "unknown"));
        let mut third = item_with_headings("", "", "");
        ctx.apply(&mut third);
        assert_eq!(third.unit, "Unit 1101");
        assert_eq!(third.room, "Living Room");
        assert_eq!(third.category, "DRYWALL");
    }
}

//! Column-shift repair for the six numeric cost columns.
//!
//! ## The defect
//!
//! Estimate tables print six cost columns in fixed order:
//!
//! ```text
//! RESET | REMOVE | REPLACE | TAX | O&P | TOTAL
//! ```
//!
//! Rows rarely populate all six; RESET in particular is blank on most rows.
//! The model, transcribing left to right, tends to drop a leading blank and
//! slot every printed value one column too far left. The row then reads as
//! if REMOVE held the RESET figure, REPLACE the REMOVE figure, and so on,
//! with TOTAL left empty or duplicating its neighbour.
//!
//! ## The repair
//!
//! Detection is an ordered list of named predicates over one row; any hit
//! flags a shift. The correction relabels rightward: each column takes the
//! value of the column to its left and REMOVE becomes `"0"` (the dropped
//! blank). Two passes run in fixed order:
//!
//! 1. the duplicate-specific pass, keyed on O&P == TOTAL, which also
//!    forces RESET to `"0"` before relabeling;
//! 2. the general safety-net pass for the remaining patterns, re-evaluated
//!    on the row the first pass may already have corrected.
//!
//! Each pass is idempotent: once its trigger no longer holds it does
//! nothing. A row whose columns are all `"0"` never fires any predicate.
//!
//! The predicates are heuristics tuned on real scanned estimates and are
//! preserved exactly as tuned; see the repository docs for the known
//! false-negative space.

use tracing::debug;

use crate::item::{LineItem, BLANK_NUMERIC};

/// Lenient numeric read of a printed cost cell.
///
/// Strips thousands commas and surrounding whitespace; blank or
/// unparseable cells read as 0.
fn to_number(raw: &str) -> f64 {
    let cleaned = raw.replace(',', "");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse().unwrap_or(0.0)
}

/// Numeric view of one row's cost columns, alongside the raw strings.
#[derive(Debug, Clone, Copy)]
struct CostView {
    reset: f64,
    remove: f64,
    replace: f64,
    tax: f64,
    oandp: f64,
    total: f64,
}

impl CostView {
    fn of(item: &LineItem) -> Self {
        CostView {
            reset: to_number(&item.reset),
            remove: to_number(&item.remove),
            replace: to_number(&item.replace),
            tax: to_number(&item.tax),
            oandp: to_number(&item.oandp),
            total: to_number(&item.total),
        }
    }
}

// ── Detection predicates ────────────────────────────────────────────────────
//
// Raw-string equality in `oandp_spilled_into_total` / `replace_spilled_into_tax`
// is deliberate: "10.00" duplicated into the next column stays "10.00", while
// a legitimate coincidence of values formats differently more often than not.

/// (a) TOTAL is empty while O&P holds a figure.
fn total_vacated(v: &CostView) -> bool {
    v.total == 0.0 && v.oandp > 0.0
}

/// (b) O&P and TOTAL hold the same printed value.
fn oandp_spilled_into_total(item: &LineItem, v: &CostView) -> bool {
    item.oandp == item.total && v.total > 0.0
}

/// (c) REPLACE and TAX hold the same printed value.
fn replace_spilled_into_tax(item: &LineItem, v: &CostView) -> bool {
    item.replace == item.tax && v.tax > 0.0
}

/// (d) RESET is blank while REMOVE and REPLACE both hold figures.
fn row_shifted_off_blank_reset(v: &CostView) -> bool {
    v.reset == 0.0 && v.remove > 0.0 && v.replace > 0.0
}

// ── Correction ──────────────────────────────────────────────────────────────

/// Relabel the cost columns one slot rightward. RESET is left alone.
fn relabel_rightward(item: &mut LineItem) {
    item.total = std::mem::take(&mut item.oandp);
    item.oandp = std::mem::take(&mut item.tax);
    item.tax = std::mem::take(&mut item.replace);
    item.replace = std::mem::take(&mut item.remove);
    item.remove = BLANK_NUMERIC.to_string();
}

/// Pass 1: the duplicate-specific repair.
///
/// Fires only on predicate (b). Forces RESET to `"0"` first: when O&P has
/// spilled into TOTAL the whole row is off by one, so whatever RESET holds
/// belongs one column to the right and the relabeling picks it up from
/// there.
pub(crate) fn duplicate_pass(item: &mut LineItem) -> bool {
    let v = CostView::of(item);
    if !oandp_spilled_into_total(item, &v) {
        return false;
    }
    item.reset = BLANK_NUMERIC.to_string();
    relabel_rightward(item);
    true
}

/// Pass 2: the general safety net.
///
/// Fires on predicates (a), (c), or (d), evaluated against the row as the
/// duplicate pass left it. RESET is not touched here.
pub(crate) fn safety_net_pass(item: &mut LineItem) -> bool {
    let v = CostView::of(item);
    if !(total_vacated(&v) || replace_spilled_into_tax(item, &v) || row_shifted_off_blank_reset(&v))
    {
        return false;
    }
    relabel_rightward(item);
    true
}

/// Run both repair passes on one row, in order.
///
/// Returns `true` if either pass changed the row.
pub fn repair_cost_columns(item: &mut LineItem) -> bool {
    let duplicate = duplicate_pass(item);
    let general = safety_net_pass(item);
    if duplicate || general {
        debug!(
            "row {}: repaired shifted cost columns (duplicate={}, general={})",
            item.serial, duplicate, general
        );
    }
    duplicate || general
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reset: &str, remove: &str, replace: &str, tax: &str, oandp: &str, total: &str) -> LineItem {
        LineItem {
            unit: "Unit 1101".into(),
            room: "Kitchen".into(),
            category: "DRYWALL".into(),
            serial: "7".into(),
            description: "repair ceiling".into(),
            qty: "1.00".into(),
            uom: "EA".into(),
            reset: reset.into(),
            remove: remove.into(),
            replace: replace.into(),
            tax: tax.into(),
            oandp: oandp.into(),
            total: total.into(),
        }
    }

    fn costs(item: &LineItem) -> [&str; 6] {
        [
            &item.reset,
            &item.remove,
            &item.replace,
            &item.tax,
            &item.oandp,
            &item.total,
        ]
    }

    #[test]
    fn lenient_numeric_reads() {
        assert_eq!(to_number("1,204.50"), 1204.5);
        assert_eq!(to_number("  12 "), 12.0);
        assert_eq!(to_number(""), 0.0);
        assert_eq!(to_number("   "), 0.0);
        assert_eq!(to_number("n/a"), 0.0);
        assert_eq!(to_number("0"), 0.0);
    }

    #[test]
    fn duplicated_oandp_row_is_repaired() {
        // The documented worked example: O&P spilled into TOTAL.
        let mut item = row("0", "5.00", "10.00", "0", "10.00", "10.00");
        assert!(repair_cost_columns(&mut item));
        assert_eq!(costs(&item), ["0", "0", "5.00", "10.00", "0", "10.00"]);
    }

    #[test]
    fn vacated_total_is_repaired() {
        // (a): TOTAL empty, O&P populated.
        let mut item = row("0", "0", "31.10", "1.55", "6.22", "0");
        assert!(repair_cost_columns(&mut item));
        assert_eq!(costs(&item), ["0", "0", "0", "31.10", "1.55", "6.22"]);
    }

    #[test]
    fn replace_spilled_into_tax_is_repaired() {
        // (c): REPLACE and TAX printed identically.
        let mut item = row("0", "0", "4.18", "4.18", "0.84", "9.20");
        assert!(repair_cost_columns(&mut item));
        assert_eq!(costs(&item), ["0", "0", "0", "4.18", "4.18", "0.84"]);
    }

    #[test]
    fn blank_reset_with_early_figures_is_repaired() {
        // (d): RESET blank while REMOVE and REPLACE hold figures.
        let mut item = row("0", "45.00", "310.50", "12.40", "73.50", "441.40");
        assert!(repair_cost_columns(&mut item));
        assert_eq!(
            costs(&item),
            ["0", "0", "45.00", "310.50", "12.40", "73.50"]
        );
    }

    #[test]
    fn all_zero_row_is_never_touched() {
        let mut item = row("0", "0", "0", "0", "0", "0");
        assert!(!repair_cost_columns(&mut item));
        assert_eq!(costs(&item), ["0", "0", "0", "0", "0", "0"]);
    }

    #[test]
    fn zero_duplicates_do_not_fire_the_duplicate_pass() {
        // O&P == TOTAL == "0" must not count as a spill, and no other
        // predicate matches this row (remove is 0, oandp is 0).
        let mut item = row("0", "0", "12.00", "0.60", "0", "0");
        assert!(!repair_cost_columns(&mut item));
    }

    #[test]
    fn clean_fully_populated_row_is_untouched() {
        let mut item = row("2.00", "45.00", "310.50", "12.40", "73.50", "443.40");
        assert!(!repair_cost_columns(&mut item));
        assert_eq!(
            costs(&item),
            ["2.00", "45.00", "310.50", "12.40", "73.50", "443.40"]
        );
    }

    #[test]
    fn repair_is_idempotent() {
        let mut item = row("0", "5.00", "10.00", "0", "10.00", "10.00");
        repair_cost_columns(&mut item);
        let once = item.clone();
        assert!(!repair_cost_columns(&mut item), "second run must be a no-op");
        assert_eq!(item, once);
    }

    #[test]
    fn duplicate_pass_forces_reset_to_zero() {
        // RESET held a stray figure on a duplicated-O&P row.
        let mut item = row("3.00", "5.00", "10.00", "0", "10.00", "10.00");
        assert!(duplicate_pass(&mut item));
        assert_eq!(item.reset, "0");
        assert_eq!(costs(&item), ["0", "0", "5.00", "10.00", "0", "10.00"]);
    }

    #[test]
    fn safety_net_does_not_touch_reset() {
        let mut item = row("2.00", "0", "31.10", "1.55", "6.22", "0");
        assert!(safety_net_pass(&mut item));
        assert_eq!(item.reset, "2.00");
        assert_eq!(costs(&item), ["2.00", "0", "0", "31.10", "1.55", "6.22"]);
    }

    #[test]
    fn comma_grouped_values_compare_numerically() {
        // (b) with thousands separators in both columns.
        let mut item = row("0", "0", "980.00", "49.00", "1,029.00", "1,029.00");
        assert!(repair_cost_columns(&mut item));
        assert_eq!(
            costs(&item),
            ["0", "0", "0", "980.00", "49.00", "1,029.00"]
        );
    }

    #[test]
    fn raw_string_equality_is_what_triggers_the_duplicate_pass() {
        // Numerically equal but formatted differently: (b) must not fire.
        // (a), (c), (d) do not fire on this row either.
        let mut item = row("1.00", "0", "31.10", "1.55", "10.0", "10.00");
        assert!(!repair_cost_columns(&mut item));
    }
}

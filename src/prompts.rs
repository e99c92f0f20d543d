//! The extraction prompt sent with every chunk.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the 13-field contract below is the same
//!    contract the schema validator and the response schema enforce;
//!    changing a field name means editing exactly one sentence here plus
//!    the item model.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    a live model, so a field dropped from the prompt is caught at test
//!    time.
//!
//! Callers can override the whole prompt via
//! [`crate::config::ExtractionConfig::prompt`]; the constant here is used
//! only when no override is provided.

/// Default extraction prompt for one PDF chunk of a cost-estimate table.
///
/// Used when `ExtractionConfig::prompt` is `None`.
pub const EXTRACTION_PROMPT: &str = r#"You are a PDF document parser. Extract every line item from the construction cost-estimate table in the attached PDF pages.

Follow these rules precisely:

1. FIELD ORDER (13 keys, always all of them, always in this order)
   [unit, room, category, serial, description, qty, uom,
    reset, remove, replace, tax, oandp, total]

2. FIELD DEFINITIONS
   - unit: centred bold text like "Unit 1101"; if not visible write "unknown"
   - room: the text beneath the unit heading (ignore the word CONTINUED);
     if not visible write "unknown"
   - category: underlined heading before a block of rows (e.g. "Floor(s)");
     if not visible write "unknown"
   - serial: the first number in the row, e.g. "591"
   - description: the full description, even when it wraps onto a second line
   - qty: the quantity, e.g. "3.07"
   - uom: the unit of measure next to qty (EA, SF, LF, ...)
   - reset, remove, replace, tax, oandp, total: the six cost columns

3. COLUMN-COUNT RULE
   After uom there are exactly SIX numeric cost columns
   [reset, remove, replace, tax, oandp, total].
   If any cell is empty insert "0". Do NOT shift later columns left.
   "0.00" counts as present, not blank.

4. VALUES
   - Every value is a string, transcribed as printed
   - Serial numbers use commas ("10,952"), never periods
   - Ignore "+", "=", and other math symbols around numbers

5. WHAT TO IGNORE
   - Anything before the first "Unit ..." heading (cover pages, summaries)
   - Page headers, footers, and page numbers

6. OUTPUT FORMAT
   - Output ONLY a single JSON object: {"items": [ ... ]}
   - One object per table row, with the 13 keys from rule 1
   - Do not rename, reorder, or omit keys
   - Do not wrap the output in ```json fences or add commentary"#;

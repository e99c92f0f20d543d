//! Pipeline stages for estimate extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different splitting backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ (model) ──▶ sanitize ──▶ schema ──▶ carry ──▶ shift
//! (URL/path) (lopdf)             (strip/fix)  (parse)   (context) (repair)
//! ```
//!
//! 1. [`input`]    — canonicalise the user-supplied path or URL to a local file
//! 2. [`split`]    — cut the PDF into page chunks; runs in `spawn_blocking`
//!    because lopdf parsing is CPU-bound
//! 3. [`sanitize`] — deterministic text cleanup on the raw model response
//!    (markdown fences, stray prose, unescaped quotes)
//! 4. [`schema`]   — parse sanitized text into typed [`crate::item::LineItem`]s
//! 5. [`carry`]    — fill missing unit/room/category from the running context
//! 6. [`shift`]    — detect and undo the off-by-one cost-column defect
//!
//! The model call itself lives in [`crate::model`]; it sits between `split`
//! and `sanitize` in the flow but is a pluggable client, not a stage.

pub mod carry;
pub mod input;
pub mod sanitize;
pub mod schema;
pub mod shift;
pub mod split;

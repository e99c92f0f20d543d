//! # pdf2estimate
//!
//! Extract structured line items from scanned construction cost estimates
//! using a vision model.
//!
//! ## Why this crate?
//!
//! Restoration estimates arrive as scanned PDFs: no text layer, a
//! 13-column table per page, headings like `Unit: 204` that govern
//! everything below them, and six numeric cost columns that OCR loves to
//! shift one position right whenever a cell is blank. Traditional table
//! extractors produce garbage on these documents. This crate instead sends
//! each slice of pages to a vision model that reads the table like a human
//! would, then runs the response through a deterministic cleanup pipeline:
//! parse into typed items, fill inherited context, and undo the
//! column-shift defect.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Split     cut into 5-page chunks via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 3. Model     one vision call per chunk (Gemini, JSON response)
//!  ├─ 4. Sanitize  strip fences/prose, re-escape broken string literals
//!  ├─ 5. Parse     typed 13-field line items
//!  ├─ 6. Carry     inherit unit/room/category across items and chunks
//!  ├─ 7. Shift     detect and undo right-shifted cost columns
//!  └─ 8. Output    merged {"items": [...]} + per-chunk reports
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2estimate::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY / GOOGLE_AI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract("estimate.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.document)?);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2estimate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2estimate = { version = "0.4", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! | Model | Speed | Best for |
//! |-------|-------|----------|
//! | `gemini-2.5-flash` | fast | Default. Clean scans, typical estimates |
//! | `gemini-2.5-pro`   | slow | Faint scans, dense handwriting in the margins |
//!
//! Any [`ExtractionModel`] implementation can be injected via
//! [`ExtractionConfig::builder`] to use another provider.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod item;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ChunkError, ExtractError};
pub use extract::{extract, extract_from_bytes, extract_sync, extract_to_file, inspect};
pub use item::{EstimateItems, LineItem};
pub use model::{ExtractionModel, GeminiClient, ModelError, ModelReply};
pub use output::{ChunkReport, DocumentMetadata, ExtractionOutput, ExtractionStats};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};

//! Result types returned by an extraction run.
//!
//! ## Why keep per-chunk reports?
//!
//! The merged document deliberately hides chunk boundaries: callers get one
//! `{"items": [...]}` no matter how the PDF was split. But when a run goes
//! wrong, one chunk times out, another returns malformed JSON, the caller
//! needs to know which pages were affected without re-running the whole
//! document. [`ChunkReport`] preserves that per-chunk story (page range,
//! item count, token usage, the error if any) alongside the merged
//! [`EstimateItems`].

use crate::error::{ChunkError, ExtractError};
use crate::item::EstimateItems;
use serde::{Deserialize, Serialize};

// ── Document metadata ────────────────────────────────────────────────────

/// Document metadata read from the PDF trailer's Info dictionary.
///
/// Populated by [`crate::inspect`] and carried on every [`ExtractionOutput`].
/// Scanner output frequently has no Info dictionary at all, in which case
/// every text field is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    /// Number of pages in the document.
    pub page_count: usize,
    /// PDF version string from the header, e.g. "1.5".
    pub pdf_version: String,
    pub is_encrypted: bool,
}

// ── Per-chunk reporting ──────────────────────────────────────────────────

/// Outcome of a single page chunk.
///
/// Exactly one of two shapes: a successful chunk has `error: None` and its
/// `items` counted into the merged document; a failed chunk has `error:
/// Some(..)`, contributed nothing, and `items` is 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReport {
    /// 0-indexed chunk number, in document order.
    pub chunk_index: usize,
    /// First page of the chunk (1-indexed, inclusive).
    pub first_page: usize,
    /// Last page of the chunk (1-indexed, inclusive).
    pub last_page: usize,
    /// Line items this chunk contributed to the merged document.
    pub items: usize,
    /// How many of those items had their cost columns repaired.
    pub repaired: usize,
    /// Prompt tokens reported by the model for this chunk.
    pub input_tokens: u32,
    /// Completion tokens reported by the model for this chunk.
    pub output_tokens: u32,
    /// Wall-clock time spent on this chunk, model call included.
    pub duration_ms: u64,
    /// Why the chunk produced nothing, if it failed.
    pub error: Option<ChunkError>,
}

// ── Run statistics ───────────────────────────────────────────────────────

/// Aggregate statistics for one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Page count of the source document.
    pub total_pages: usize,
    /// Number of chunks the document was split into.
    pub total_chunks: usize,
    /// Chunks that produced items.
    pub processed_chunks: usize,
    /// Chunks that failed and were skipped.
    pub failed_chunks: usize,
    /// Line items in the merged document.
    pub total_items: usize,
    /// Items whose cost columns were shifted back into place.
    pub repaired_items: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// End-to-end wall-clock time for the run.
    pub total_duration_ms: u64,
    /// Time spent splitting the PDF into chunks.
    pub split_duration_ms: u64,
    /// Time spent processing chunks, model calls included, summed across chunks.
    pub model_duration_ms: u64,
}

// ── Full output ──────────────────────────────────────────────────────────

/// Everything an extraction run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Merged line items across all successful chunks, in document order.
    pub document: EstimateItems,
    /// Per-chunk reports in chunk order, failed chunks included.
    pub chunks: Vec<ChunkReport>,
    /// Metadata read from the source PDF.
    pub metadata: DocumentMetadata,
    /// Aggregate run statistics.
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Escalate chunk failures into a hard error.
    ///
    /// [`crate::extract`] treats chunk failures as non-fatal: the run
    /// succeeds with whatever the healthy chunks produced, and the failures
    /// live in `chunks[..].error`. Callers that would rather reject an
    /// incomplete document chain this on the result:
    ///
    /// ```rust,no_run
    /// # use pdf2estimate::{extract, ExtractionConfig};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let output = extract("estimate.pdf", &ExtractionConfig::default())
    ///     .await?
    ///     .into_result()?; // Err if any chunk failed
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_result(self) -> Result<Self, ExtractError> {
        if self.stats.failed_chunks > 0 {
            return Err(ExtractError::PartialFailure {
                success: self.stats.processed_chunks,
                failed: self.stats.failed_chunks,
                total: self.stats.total_chunks,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::LineItem;

    fn sample_item() -> LineItem {
        LineItem {
            unit: "Unit A".into(),
            room: "Kitchen".into(),
            category: "Drywall".into(),
            serial: "12".into(),
            description: "Patch ceiling".into(),
            qty: "40.00".into(),
            uom: "SF".into(),
            reset: "0".into(),
            remove: "0".into(),
            replace: "1.50".into(),
            tax: "3.10".into(),
            oandp: "12.40".into(),
            total: "75.50".into(),
        }
    }

    fn output_with(failed: usize, processed: usize) -> ExtractionOutput {
        ExtractionOutput {
            document: EstimateItems {
                items: vec![sample_item()],
            },
            chunks: vec![],
            metadata: DocumentMetadata::default(),
            stats: ExtractionStats {
                total_chunks: failed + processed,
                processed_chunks: processed,
                failed_chunks: failed,
                total_items: 1,
                ..Default::default()
            },
        }
    }

    #[test]
    fn into_result_passes_through_clean_runs() {
        let output = output_with(0, 3);
        let output = output.into_result().unwrap();
        assert_eq!(output.document.len(), 1);
    }

    #[test]
    fn into_result_escalates_failed_chunks() {
        let err = output_with(2, 1).into_result().unwrap_err();
        match err {
            ExtractError::PartialFailure {
                success,
                failed,
                total,
            } => {
                assert_eq!(success, 1);
                assert_eq!(failed, 2);
                assert_eq!(total, 3);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn chunk_report_serialises_its_error() {
        let report = ChunkReport {
            chunk_index: 1,
            first_page: 6,
            last_page: 10,
            items: 0,
            repaired: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 840,
            error: Some(ChunkError::Parse {
                chunk: 1,
                detail: "expected value at line 1 column 1".into(),
            }),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["chunk_index"], 1);
        assert_eq!(json["error"]["Parse"]["chunk"], 1);
        assert!(json["error"]["Parse"]["detail"]
            .as_str()
            .unwrap()
            .contains("expected value"));
    }

    #[test]
    fn full_output_serialises_with_items_under_document() {
        let json = serde_json::to_value(output_with(0, 1)).unwrap();
        assert!(json["document"]["items"].is_array());
        assert_eq!(json["document"]["items"][0]["unit"], "Unit A");
        assert_eq!(json["stats"]["total_items"], 1);
        assert!(json["metadata"]["title"].is_null());
    }
}

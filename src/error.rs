//! Error types for the pdf2estimate library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the extraction cannot proceed at all
//!   (bad input file, corrupt PDF, no API key). Returned as
//!   `Err(ExtractError)` from the top-level `extract*` functions.
//!
//! * [`ChunkError`] — **Non-fatal**: a single page chunk failed (model
//!   outage, unparseable response, wrong shape) but every other chunk is
//!   fine. Stored inside [`crate::output::ChunkReport`] so callers can
//!   inspect partial success rather than losing the whole document to one
//!   bad chunk.
//!
//! The run never aborts on a [`ChunkError`]: the orchestrator logs it, skips
//! the chunk, and keeps going. Callers who want strictness can upgrade via
//! [`crate::output::ExtractionOutput::into_result`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2estimate library.
///
/// Chunk-level failures use [`ChunkError`] and are stored in
/// [`crate::output::ChunkReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf repaired.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF is encrypted; chunk bytes would be unreadable for the model.
    #[error("PDF '{path}' is encrypted.\nDecrypt it first with: qpdf --decrypt input.pdf decrypted.pdf")]
    EncryptedPdf { path: PathBuf },

    /// PDF parsed fine but contains no pages.
    #[error("PDF '{path}' contains no pages")]
    EmptyPdf { path: PathBuf },

    /// Re-saving a page range as a standalone PDF failed.
    #[error("Failed to assemble chunk {chunk} (pages {first}-{last}): {detail}")]
    ChunkAssemblyFailed {
        chunk: usize,
        first: usize,
        last: usize,
        detail: String,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// No API key in config and none of the known env vars are set.
    #[error("No Gemini API key configured.\n{hint}")]
    MissingApiKey { hint: String },

    /// Some chunks succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::ExtractionOutput::into_result`] when
    /// the caller wants to treat any chunk failure as an error.
    #[error("{failed}/{total} chunks failed during extraction")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page chunk.
///
/// Stored alongside [`crate::output::ChunkReport`] when a chunk fails.
/// The overall run continues regardless; even an all-chunks-failed run
/// still emits an empty item collection.
///
/// `chunk` is the zero-based chunk index, matching the debug artifact
/// file names (`chunk_0_error.txt` and friends).
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Transport or model failure: the call never produced usable text.
    #[error("Chunk {chunk}: model call failed: {detail}")]
    Service { chunk: usize, detail: String },

    /// The sanitized response is still not valid JSON.
    #[error("Chunk {chunk}: response is not valid JSON: {detail}")]
    Parse { chunk: usize, detail: String },

    /// Valid JSON, but not the expected `{"items": [...]}` shape.
    #[error("Chunk {chunk}: response does not match the item schema: {detail}")]
    Schema { chunk: usize, detail: String },
}

impl ChunkError {
    /// Zero-based index of the chunk this error belongs to.
    pub fn chunk(&self) -> usize {
        match self {
            ChunkError::Service { chunk, .. }
            | ChunkError::Parse { chunk, .. }
            | ChunkError::Schema { chunk, .. } => *chunk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = ExtractError::PartialFailure {
            success: 2,
            failed: 1,
            total: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/3"), "got: {msg}");
    }

    #[test]
    fn missing_api_key_display_carries_hint() {
        let e = ExtractError::MissingApiKey {
            hint: "Set GEMINI_API_KEY or pass --api-key.".into(),
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn encrypted_pdf_display_names_qpdf() {
        let e = ExtractError::EncryptedPdf {
            path: PathBuf::from("locked.pdf"),
        };
        assert!(e.to_string().contains("qpdf --decrypt"));
    }

    #[test]
    fn chunk_error_display_carries_index() {
        let e = ChunkError::Parse {
            chunk: 2,
            detail: "expected value at line 1".into(),
        };
        assert!(e.to_string().contains("Chunk 2"));
        assert!(e.to_string().contains("expected value"));
    }

    #[test]
    fn chunk_error_index_accessor() {
        let e = ChunkError::Service {
            chunk: 7,
            detail: "connection refused".into(),
        };
        assert_eq!(e.chunk(), 7);
    }

    #[test]
    fn chunk_error_round_trips_through_serde() {
        let e = ChunkError::Schema {
            chunk: 1,
            detail: "missing field `total`".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: ChunkError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk(), 1);
        assert!(back.to_string().contains("missing field"));
    }
}

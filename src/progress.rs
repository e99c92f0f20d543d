//! Progress-callback trait for per-chunk extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through each page chunk.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database
//! record, or a terminal progress bar without the library knowing anything
//! about how the host application communicates. The trait is `Send + Sync`
//! so it works when the extraction runs inside a spawned tokio task.
//!
//! Chunks are processed strictly in document order (later chunks inherit
//! heading context from earlier ones), so events always arrive in order:
//! `on_run_start`, then start/complete-or-error per chunk, then
//! `on_run_complete`.
//!
//! # Example
//!
//! ```rust
//! use pdf2estimate::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk_index: usize, total_chunks: usize, items: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{}/{} chunks done ({} items)", done, total_chunks, items);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each chunk.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
///
/// Chunk indices are 0-based everywhere in this crate; add 1 for display.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the PDF has been split, before any model call.
    ///
    /// # Arguments
    /// * `total_chunks` — number of chunks that will be processed
    fn on_run_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the model request is sent for a chunk.
    ///
    /// # Arguments
    /// * `chunk_index`  — 0-indexed chunk number
    /// * `total_chunks` — total chunks in the run
    fn on_chunk_start(&self, chunk_index: usize, total_chunks: usize) {
        let _ = (chunk_index, total_chunks);
    }

    /// Called when a chunk's items have been parsed, carried, and repaired.
    ///
    /// # Arguments
    /// * `chunk_index`  — 0-indexed chunk number
    /// * `total_chunks` — total chunks
    /// * `items`        — line items the chunk contributed
    fn on_chunk_complete(&self, chunk_index: usize, total_chunks: usize, items: usize) {
        let _ = (chunk_index, total_chunks, items);
    }

    /// Called when a chunk fails and is skipped.
    ///
    /// # Arguments
    /// * `chunk_index`  — 0-indexed chunk number
    /// * `total_chunks` — total chunks
    /// * `error`        — human-readable error description
    fn on_chunk_error(&self, chunk_index: usize, total_chunks: usize, error: &str) {
        let _ = (chunk_index, total_chunks, error);
    }

    /// Called once after every chunk has been attempted.
    ///
    /// # Arguments
    /// * `total_chunks`  — total chunks in the run
    /// * `success_count` — chunks that produced items
    fn on_run_complete(&self, total_chunks: usize, success_count: usize) {
        let _ = (total_chunks, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

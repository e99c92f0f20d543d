//! PDF chunking: save consecutive page ranges as standalone PDFs.
//!
//! ## Why object-level splitting?
//!
//! The model consumes PDF bytes directly, so there is no rasterisation
//! step anywhere. Each chunk is produced by cloning the parsed document,
//! deleting every page outside the range, pruning the now-unreachable
//! objects, and saving the result. Shared resources (fonts, form XObjects)
//! stay intact in every chunk that still references them, which keeps the
//! chunks readable to the model at a fraction of full-render cost.
//!
//! ## Why spawn_blocking?
//!
//! Parsing, pruning, and re-serialising a scanned PDF is CPU-bound work on
//! documents that are mostly embedded images. `tokio::task::spawn_blocking`
//! keeps it off the async worker threads.

use std::path::Path;

use lopdf::{Document, Object};
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::output::DocumentMetadata;

/// One consecutive page range of the input, saved as a standalone PDF.
#[derive(Debug, Clone)]
pub struct PdfChunk {
    /// Zero-based chunk index, in document order.
    pub index: usize,
    /// First page of the range, 1-based inclusive.
    pub first_page: usize,
    /// Last page of the range, 1-based inclusive.
    pub last_page: usize,
    /// The chunk as a complete PDF document.
    pub bytes: Vec<u8>,
}

impl PdfChunk {
    /// Number of pages in this chunk.
    pub fn page_count(&self) -> usize {
        self.last_page - self.first_page + 1
    }
}

/// Split a PDF into chunks of `pages_per_chunk` consecutive pages.
///
/// The final chunk holds whatever remains and may be shorter. Chunks come
/// back in document order, which the orchestrator must preserve for the
/// carry context to see items in reading order.
pub async fn split_into_chunks(
    pdf_path: &Path,
    pages_per_chunk: usize,
) -> Result<Vec<PdfChunk>, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || split_blocking(&path, pages_per_chunk))
        .await
        .map_err(|e| ExtractError::Internal(format!("Split task panicked: {}", e)))?
}

/// Blocking implementation of the split.
fn split_blocking(pdf_path: &Path, pages_per_chunk: usize) -> Result<Vec<PdfChunk>, ExtractError> {
    let document = Document::load(pdf_path).map_err(|e| ExtractError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if document.is_encrypted() {
        return Err(ExtractError::EncryptedPdf {
            path: pdf_path.to_path_buf(),
        });
    }

    let total_pages = document.get_pages().len();
    if total_pages == 0 {
        return Err(ExtractError::EmptyPdf {
            path: pdf_path.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages", total_pages);

    let ranges = chunk_ranges(total_pages, pages_per_chunk);
    let mut chunks = Vec::with_capacity(ranges.len());

    for (index, (first, last)) in ranges.into_iter().enumerate() {
        let bytes = save_page_range(&document, first, last).map_err(|e| {
            ExtractError::ChunkAssemblyFailed {
                chunk: index,
                first,
                last,
                detail: e.to_string(),
            }
        })?;
        debug!(
            "chunk {}: pages {}-{} ({} bytes)",
            index,
            first,
            last,
            bytes.len()
        );
        chunks.push(PdfChunk {
            index,
            first_page: first,
            last_page: last,
            bytes,
        });
    }

    Ok(chunks)
}

/// 1-based inclusive page ranges covering `total_pages` in steps of
/// `pages_per_chunk` (clamped to at least 1).
pub(crate) fn chunk_ranges(total_pages: usize, pages_per_chunk: usize) -> Vec<(usize, usize)> {
    let size = pages_per_chunk.max(1);
    (1..=total_pages)
        .step_by(size)
        .map(|first| (first, (first + size - 1).min(total_pages)))
        .collect()
}

/// Re-save pages `first..=last` (1-based) of `document` as a standalone PDF.
fn save_page_range(document: &Document, first: usize, last: usize) -> Result<Vec<u8>, lopdf::Error> {
    let mut part = document.clone();

    let doomed: Vec<u32> = part
        .get_pages()
        .keys()
        .copied()
        .filter(|&page| (page as usize) < first || (page as usize) > last)
        .collect();
    part.delete_pages(&doomed);
    part.prune_objects();
    part.renumber_objects();

    // Strict readers reject a page tree whose Count disagrees with its
    // Kids; recompute it from what is actually left.
    let remaining = part.get_pages().len() as i64;
    let pages_id = part
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference);
    if let Ok(pages_id) = pages_id {
        if let Ok(pages) = part.get_object_mut(pages_id).and_then(Object::as_dict_mut) {
            pages.set("Count", remaining);
        }
    }

    let mut bytes = Vec::new();
    part.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Read document structure and Info-dictionary metadata without touching
/// the model.
pub async fn inspect_document(pdf_path: &Path) -> Result<DocumentMetadata, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || inspect_blocking(&path))
        .await
        .map_err(|e| ExtractError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Blocking implementation of document inspection.
fn inspect_blocking(pdf_path: &Path) -> Result<DocumentMetadata, ExtractError> {
    let document = Document::load(pdf_path).map_err(|e| ExtractError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let info_string = |key: &[u8]| -> Option<String> {
        let info = document
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| document.get_object(id))
            .and_then(Object::as_dict)
            .ok()?;
        match info.get(key).ok()? {
            Object::String(bytes, _) => String::from_utf8(bytes.clone())
                .ok()
                .or_else(|| Some(bytes.iter().map(|&b| b as char).collect()))
                .filter(|s| !s.trim().is_empty()),
            _ => None,
        }
    };

    Ok(DocumentMetadata {
        title: info_string(b"Title"),
        author: info_string(b"Author"),
        subject: info_string(b"Subject"),
        keywords: info_string(b"Keywords"),
        page_count: document.get_pages().len(),
        pdf_version: document.version.clone(),
        is_encrypted: document.is_encrypted(),
    })
}

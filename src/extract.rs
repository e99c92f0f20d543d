//! Eager (full-document) extraction entry points.
//!
//! ## Why chunks run sequentially
//!
//! A cost estimate reads top to bottom: a `Unit:` heading on page 3 governs
//! every line item until the next heading, even when that item sits in a
//! later chunk. [`CarryContext`] threads that running context through the
//! chunk loop, which makes chunk order part of the output's meaning, not an
//! implementation detail. Concurrent model calls would be faster, but an
//! item cannot be contextualised until every earlier chunk has been parsed,
//! so the loop stays sequential.
//!
//! Chunk failures are non-fatal by design. Scanned estimates are long and
//! model responses occasionally come back malformed; losing five pages is
//! recoverable, losing the whole run is not. Each failure is logged,
//! recorded in its [`ChunkReport`], and the loop moves on.

use crate::config::ExtractionConfig;
use crate::error::{ChunkError, ExtractError};
use crate::item::{EstimateItems, LineItem};
use crate::model::{ExtractionModel, GeminiClient};
use crate::output::{ChunkReport, DocumentMetadata, ExtractionOutput, ExtractionStats};
use crate::pipeline::carry::CarryContext;
use crate::pipeline::split::PdfChunk;
use crate::pipeline::{input, sanitize, schema, shift, split};
use crate::prompts::EXTRACTION_PROMPT;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract line items from a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Extraction configuration
///
/// # Returns
/// `Ok(ExtractionOutput)` even when some chunks failed: failed chunks
/// contribute no items and carry their error in `output.chunks`. Chain
/// [`ExtractionOutput::into_result`] to reject incomplete documents.
///
/// # Errors
/// Returns `Err(ExtractError)` only for run-level failures:
/// - File not found / not a PDF / download failed
/// - Corrupt, encrypted, or empty PDF
/// - No API key available and no model client injected
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Resolve model client ─────────────────────────────────────
    let model = resolve_model(config)?;
    debug!("Using model: {}", model.name());

    // ── Step 3: Read metadata ────────────────────────────────────────────
    let metadata = split::inspect_document(&pdf_path).await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 4: Split into page chunks ───────────────────────────────────
    let split_start = Instant::now();
    let chunks = split::split_into_chunks(&pdf_path, config.pages_per_chunk).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;
    let total_chunks = chunks.len();
    info!(
        "Split {} pages into {} chunks of up to {} in {}ms",
        total_pages, total_chunks, config.pages_per_chunk, split_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_chunks);
    }

    // ── Step 5: Process chunks through the model ─────────────────────────
    let prompt = config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);
    let mut carry = CarryContext::default();
    let mut document = EstimateItems::default();
    let mut reports: Vec<ChunkReport> = Vec::with_capacity(total_chunks);

    for chunk in &chunks {
        let (report, items) =
            process_chunk(&model, chunk, total_chunks, &mut carry, prompt, config).await;
        document.items.extend(items);
        reports.push(report);
    }

    // ── Step 6: Compute stats ────────────────────────────────────────────
    let processed = reports.iter().filter(|r| r.error.is_none()).count();
    let failed = total_chunks - processed;
    if processed == 0 {
        warn!(
            "All {} chunks failed; output contains no items",
            total_chunks
        );
    }

    let stats = ExtractionStats {
        total_pages,
        total_chunks,
        processed_chunks: processed,
        failed_chunks: failed,
        total_items: document.len(),
        repaired_items: reports.iter().map(|r| r.repaired).sum(),
        total_input_tokens: reports.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: reports.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        split_duration_ms,
        model_duration_ms: reports.iter().map(|r| r.duration_ms).sum(),
    };

    info!(
        "Extraction complete: {} items from {}/{} chunks, {}ms total",
        stats.total_items, processed, total_chunks, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_chunks, processed);
    }

    Ok(ExtractionOutput {
        document,
        chunks: reports,
        metadata,
        stats,
    })
}

/// Extract line items and write the merged document directly to a file.
///
/// The file receives pretty-printed `{"items": [...]}` JSON; per-chunk
/// reports and stats are returned, not written. Uses atomic write (temp
/// file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract(input_str, config).await?;
    let path = output_path.as_ref();

    let mut json = serde_json::to_string_pretty(&output.document)
        .map_err(|e| ExtractError::Internal(format!("serialise output: {e}")))?;
    json.push('\n');

    // Atomic write: write to temp, then rename
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtractError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Read PDF metadata without extracting content.
///
/// Does not require an API key or a model client.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, ExtractError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let pdf_path = resolved.path().to_path_buf();
    split::inspect_document(&pdf_path).await
}

/// Extract line items from PDF bytes in memory.
///
/// This avoids the need for the caller to create a temporary file.
/// Internally the library writes `bytes` to a managed [`tempfile`] and
/// cleans it up automatically on return or panic.
///
/// This is the recommended API when PDF data comes from a database, network
/// stream, or in-memory buffer rather than a file on disk.
///
/// # Example
/// ```rust,no_run
/// use pdf2estimate::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("estimate.pdf")?;
/// let config = ExtractionConfig::default();
/// let output = extract_from_bytes(&bytes, &config).await?;
/// println!("{} items", output.document.len());
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(&path, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the model client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.model_client`) — the caller constructed
///    and configured the client entirely; we use it as-is. Useful in tests
///    or when the caller wraps the model call in custom middleware.
///
/// 2. **Explicit API key** (`config.api_key`) — build a [`GeminiClient`]
///    with that key and the config's model, temperature, token limit, and
///    timeout.
///
/// 3. **Environment** — [`GeminiClient::from_env`] reads `GEMINI_API_KEY`
///    then `GOOGLE_AI_API_KEY`. Convenient for `pdf2estimate estimate.pdf`
///    with no other configuration.
fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn ExtractionModel>, ExtractError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }

    let client = match config.api_key {
        Some(ref key) => GeminiClient::new(key.clone())?,
        None => GeminiClient::from_env()?,
    };
    let mut client = client
        .with_temperature(config.temperature)
        .with_max_output_tokens(config.max_output_tokens)
        .with_timeout_secs(config.api_timeout_secs);
    if let Some(ref model) = config.model {
        client = client.with_model(model.clone());
    }
    Ok(Arc::new(client))
}

/// Run one chunk through the model and the cleanup pipeline.
///
/// Returns the chunk's report and the items it contributed. A failed chunk
/// returns an empty item list and leaves `carry` untouched, so the running
/// context skips over the gap to the next successful chunk.
async fn process_chunk(
    model: &Arc<dyn ExtractionModel>,
    chunk: &PdfChunk,
    total_chunks: usize,
    carry: &mut CarryContext,
    prompt: &str,
    config: &ExtractionConfig,
) -> (ChunkReport, Vec<LineItem>) {
    let start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_start(chunk.index, total_chunks);
    }

    let reply = match model.extract_items(&chunk.bytes, prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            let error = ChunkError::Service {
                chunk: chunk.index,
                detail: e.to_string(),
            };
            warn!(
                "Chunk {} (pages {}-{}) failed: {}",
                chunk.index, chunk.first_page, chunk.last_page, error
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_error(chunk.index, total_chunks, &error.to_string());
            }
            return (
                ChunkReport {
                    chunk_index: chunk.index,
                    first_page: chunk.first_page,
                    last_page: chunk.last_page,
                    items: 0,
                    repaired: 0,
                    input_tokens: 0,
                    output_tokens: 0,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(error),
                },
                Vec::new(),
            );
        }
    };

    let cleaned = sanitize::sanitize_response(&reply.text);
    let parsed = match schema::parse_items(&cleaned) {
        Ok(parsed) => parsed,
        Err(e) => {
            let error = match e {
                schema::ItemsParseError::Json(_) => ChunkError::Parse {
                    chunk: chunk.index,
                    detail: e.to_string(),
                },
                schema::ItemsParseError::Shape(_) => ChunkError::Schema {
                    chunk: chunk.index,
                    detail: e.to_string(),
                },
            };
            warn!(
                "Chunk {} (pages {}-{}) failed: {}",
                chunk.index, chunk.first_page, chunk.last_page, error
            );
            if let Some(ref dir) = config.debug_dir {
                write_debug_artifact(
                    dir,
                    &format!("chunk_{}_error.txt", chunk.index),
                    reply.text.as_bytes(),
                );
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_error(chunk.index, total_chunks, &error.to_string());
            }
            return (
                ChunkReport {
                    chunk_index: chunk.index,
                    first_page: chunk.first_page,
                    last_page: chunk.last_page,
                    items: 0,
                    repaired: 0,
                    input_tokens: reply.input_tokens,
                    output_tokens: reply.output_tokens,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(error),
                },
                Vec::new(),
            );
        }
    };

    let mut items = parsed.items;
    let mut repaired = 0usize;
    for item in &mut items {
        carry.apply(item);
        if shift::repair_cost_columns(item) {
            repaired += 1;
        }
    }

    debug!(
        "Chunk {} (pages {}-{}): {} items, {} repaired",
        chunk.index,
        chunk.first_page,
        chunk.last_page,
        items.len(),
        repaired
    );

    if let Some(ref dir) = config.debug_dir {
        match serde_json::to_string_pretty(&items) {
            Ok(json) => write_debug_artifact(
                dir,
                &format!("chunk_{}_items.json", chunk.index),
                json.as_bytes(),
            ),
            Err(e) => warn!("Failed to serialise debug items for chunk {}: {}", chunk.index, e),
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_complete(chunk.index, total_chunks, items.len());
    }

    (
        ChunkReport {
            chunk_index: chunk.index,
            first_page: chunk.first_page,
            last_page: chunk.last_page,
            items: items.len(),
            repaired,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        items,
    )
}

/// Best-effort write of a per-chunk debug artifact. Failures are logged,
/// never fatal.
fn write_debug_artifact(dir: &Path, name: &str, contents: &[u8]) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("Failed to create debug dir {}: {}", dir.display(), e);
        return;
    }
    let path = dir.join(name);
    if let Err(e) = std::fs::write(&path, contents) {
        warn!("Failed to write debug artifact {}: {}", path.display(), e);
    }
}

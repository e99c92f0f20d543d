//! CLI binary for pdf2estimate.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2estimate::{
    extract, extract_to_file, inspect, ExtractionConfig, ExtractionProgressCallback,
    ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-chunk log
/// lines using [indicatif]. Chunks are processed sequentially, so lines
/// always appear in document order.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-chunk wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_run_start` (called once the PDF has been split).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Splitting PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_chunks: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual chunk count.
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting extraction: {total_chunks} chunks…"))
        ));
    }

    fn on_chunk_start(&self, chunk_index: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(chunk_index, Instant::now());
        self.bar.set_message(format!("chunk {}", chunk_index + 1));
    }

    fn on_chunk_complete(&self, chunk_index: usize, total: usize, items: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {:<10}  {}",
            green("✓"),
            chunk_index + 1,
            total,
            dim(&format!("{items:>4} items")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk_index: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>2}/{:<2}  {}  {}",
            red("✗"),
            chunk_index + 1,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_chunks: usize, success_count: usize) {
        let failed = total_chunks.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} chunks extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunks extracted  ({} failed)",
                if failed == total_chunks {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic extraction (stdout)
  pdf2estimate estimate.pdf

  # Write the merged document to a file
  pdf2estimate estimate.pdf -o items.json

  # Smaller chunks for very dense estimates
  pdf2estimate --pages-per-chunk 3 estimate.pdf -o items.json

  # Use a specific model
  pdf2estimate --model gemini-2.5-pro estimate.pdf

  # Extract from URL
  pdf2estimate https://example.com/claims/1042/estimate.pdf -o items.json

  # Inspect PDF metadata (no API key needed)
  pdf2estimate --inspect-only estimate.pdf

  # Keep per-chunk artifacts for debugging a bad response
  pdf2estimate --debug-dir ./chunks estimate.pdf -o items.json

  # Full run report as JSON (items + per-chunk reports + stats)
  pdf2estimate --json estimate.pdf > report.json

OUTPUT:
  The merged document is a single JSON object:

    {"items": [ {"unit": "204", "room": "Kitchen", ...}, ... ]}

  Each item carries 13 string fields: unit, room, category, serial,
  description, qty, uom, reset, remove, replace, tax, oandp, total.
  A chunk that fails is logged and skipped; its pages contribute no
  items and the run still exits 0. Pass --strict to exit non-zero
  whenever a chunk failed.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY           Google AI API key (checked first)
  GOOGLE_AI_API_KEY        Google AI API key (fallback)
  PDF2ESTIMATE_MODEL       Override model ID

SETUP:
  1. Set API key:  export GEMINI_API_KEY=...
  2. Extract:      pdf2estimate estimate.pdf -o items.json
"#;

/// Extract line items from scanned cost-estimate PDFs using a vision model.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2estimate",
    version,
    about = "Extract line items from scanned cost-estimate PDFs using a vision model",
    long_about = "Extract structured line-item records from scanned construction cost estimates \
(local files or URLs). The PDF is split into page chunks, each chunk is read by a Google Gemini \
vision model, and the responses are parsed, contextualised, and repaired into a single \
{\"items\": [...]} document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the merged items JSON to this file instead of stdout.
    #[arg(short, long, env = "PDF2ESTIMATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID (e.g. gemini-2.5-flash, gemini-2.5-pro).
    #[arg(
        long,
        env = "PDF2ESTIMATE_MODEL",
        long_help = "Vision model to use. Default: gemini-2.5-flash.\n\
          gemini-2.5-pro reads faint scans better at several times the cost."
    )]
    model: Option<String>,

    /// Google AI API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Pages per chunk sent to the model in one request.
    #[arg(long, env = "PDF2ESTIMATE_PAGES_PER_CHUNK", default_value_t = 5,
          value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pages_per_chunk: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "PDF2ESTIMATE_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max model output tokens per chunk.
    #[arg(long, env = "PDF2ESTIMATE_MAX_TOKENS", default_value_t = 8192)]
    max_output_tokens: u32,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "PDF2ESTIMATE_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Write per-chunk debug artifacts (parsed items, failed raw responses) here.
    #[arg(long, env = "PDF2ESTIMATE_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    /// Output the full run report (items + per-chunk reports + stats) as JSON.
    #[arg(long, env = "PDF2ESTIMATE_JSON")]
    json: bool,

    /// Exit non-zero if any chunk failed.
    #[arg(long)]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2ESTIMATE_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2ESTIMATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2ESTIMATE_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2ESTIMATE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-chunk model call timeout in seconds.
    #[arg(long, env = "PDF2ESTIMATE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.quiet || show_progress {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    // In verbose mode we always want all logs regardless of progress.
    let filter = if cli.verbose { "debug" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            if let Some(ref k) = meta.keywords {
                println!("Keywords:     {}", k);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Encrypted:    {}", meta.is_encrypted);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    // The progress bar is initialised with a spinner (no chunk count yet);
    // `on_run_start` resizes it to the correct total once the PDF has been
    // split. `show_progress` was already computed above.

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = extract_to_file(&cli.input, output_path, &config)
            .await
            .context("Extraction failed")?;

        // Summary line (callback already printed the per-chunk log).
        if !cli.quiet {
            eprintln!(
                "{}  {} items from {}/{} chunks  {}ms  →  {}",
                if stats.failed_chunks == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.total_items,
                stats.processed_chunks,
                stats.total_chunks,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&stats.total_input_tokens.to_string()),
                dim(&stats.total_output_tokens.to_string()),
            );
        }

        if cli.strict && stats.failed_chunks > 0 {
            anyhow::bail!(
                "{} of {} chunks failed (--strict)",
                stats.failed_chunks,
                stats.total_chunks
            );
        }
    } else {
        let output = extract(&cli.input, &config)
            .await
            .context("Extraction failed")?;
        let output = if cli.strict {
            output.into_result().context("Extraction incomplete")?
        } else {
            output
        };

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let document = serde_json::to_string_pretty(&output.document)
                .context("Failed to serialise items")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(document.as_bytes())
                .context("Failed to write to stdout")?;
            handle.write_all(b"\n").ok();
        }

        // Summary (the callback already printed the final green/red tick).
        if !cli.quiet && !show_progress {
            // Only print inline stats when the progress callback is disabled.
            eprintln!(
                "Extracted {} items from {}/{} chunks in {}ms",
                output.stats.total_items,
                output.stats.processed_chunks,
                output.stats.total_chunks,
                output.stats.total_duration_ms
            );
            if output.stats.failed_chunks > 0 {
                eprintln!("  {} chunks failed", output.stats.failed_chunks);
            }
        } else if !cli.quiet && !cli.json {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let prompt = if let Some(ref path) = cli.prompt_file {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read extraction prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .pages_per_chunk(cli.pages_per_chunk)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_output_tokens)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Optional fields pass through as-is.
    config.model = cli.model.clone();
    config.api_key = cli.api_key.clone();
    config.prompt = prompt;
    config.debug_dir = cli.debug_dir.clone();

    Ok(config)
}

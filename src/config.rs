//! Configuration types for estimate extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ExtractError;
use crate::model::ExtractionModel;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for an extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2estimate::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .pages_per_chunk(3)
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Pages per chunk sent to the model in one request. Minimum 1. Default: 5.
    ///
    /// Five pages keeps the inline PDF payload comfortably under request
    /// size limits while bounding the blast radius of a bad response: when
    /// one chunk fails, at most five pages of line items are lost. Lower it
    /// for very dense estimates that overflow `max_output_tokens`; raise it
    /// to cut request count on sparse documents.
    pub pages_per_chunk: usize,

    /// Model identifier, e.g. "gemini-2.5-flash".
    /// If None, uses [`crate::model::DEFAULT_MODEL`].
    pub model: Option<String>,

    /// API key for the hosted model. If None, read from `GEMINI_API_KEY`
    /// or `GOOGLE_AI_API_KEY` when the client is constructed.
    pub api_key: Option<String>,

    /// Pre-constructed model client. Takes precedence over `model` and
    /// `api_key`. Useful in tests and when the caller needs custom
    /// middleware around the model call (caching, rate limiting).
    pub model_client: Option<Arc<dyn ExtractionModel>>,

    /// Sampling temperature for the model completion. Default: 0.0.
    ///
    /// Zero makes the model deterministic and faithful to what it sees in
    /// the table, which is exactly what transcription wants. Higher values
    /// introduce creativity that corrupts numeric columns.
    pub temperature: f32,

    /// Maximum tokens the model may generate per chunk. Default: 8192.
    ///
    /// A dense five-page chunk can carry well over a hundred line items, and
    /// at roughly 60 output tokens per item the response passes 4 096
    /// easily. Setting this too low truncates the JSON mid-array, which then
    /// fails to parse and costs the whole chunk.
    pub max_output_tokens: u32,

    /// Custom extraction prompt. If None, uses the built-in
    /// [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Directory for per-chunk debug artifacts. Default: None (no artifacts).
    ///
    /// When set, every successful chunk writes `chunk_{i}_items.json` with
    /// its parsed items, and every parse failure writes `chunk_{i}_error.txt`
    /// with the raw model text, so a bad response can be inspected without
    /// re-running the model. The directory is created if missing.
    pub debug_dir: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-model-call timeout in seconds. Default: 120.
    ///
    /// A vision request over a five-page PDF routinely takes tens of
    /// seconds, so this is deliberately more generous than a typical
    /// chat-completion timeout.
    pub api_timeout_secs: u64,

    /// Optional callback receiving per-chunk progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pages_per_chunk: 5,
            model: None,
            api_key: None,
            model_client: None,
            temperature: 0.0,
            max_output_tokens: 8192,
            prompt: None,
            debug_dir: None,
            download_timeout_secs: 120,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("pages_per_chunk", &self.pages_per_chunk)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "model_client",
                &self.model_client.as_ref().map(|_| "<dyn ExtractionModel>"),
            )
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("debug_dir", &self.debug_dir)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn pages_per_chunk(mut self, n: usize) -> Self {
        self.config.pages_per_chunk = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model_client(mut self, client: Arc<dyn ExtractionModel>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.debug_dir = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.pages_per_chunk == 0 {
            return Err(ExtractError::InvalidConfig(
                "pages_per_chunk must be ≥ 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(ExtractError::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgressCallback;

    #[test]
    fn defaults_match_documented_values() {
        let config = ExtractionConfig::default();
        assert_eq!(config.pages_per_chunk, 5);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_output_tokens, 8192);
        assert_eq!(config.download_timeout_secs, 120);
        assert_eq!(config.api_timeout_secs, 120);
        assert!(config.model.is_none());
        assert!(config.api_key.is_none());
        assert!(config.model_client.is_none());
        assert!(config.prompt.is_none());
        assert!(config.debug_dir.is_none());
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let config = ExtractionConfig::builder()
            .pages_per_chunk(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(config.pages_per_chunk, 1);
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn builder_sets_every_field() {
        let config = ExtractionConfig::builder()
            .pages_per_chunk(2)
            .model("gemini-2.5-pro")
            .api_key("test-key")
            .temperature(0.2)
            .max_output_tokens(4096)
            .prompt("extract the table")
            .debug_dir("/tmp/chunks")
            .download_timeout_secs(30)
            .api_timeout_secs(45)
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();

        assert_eq!(config.pages_per_chunk, 2);
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_output_tokens, 4096);
        assert_eq!(config.prompt.as_deref(), Some("extract the table"));
        assert_eq!(
            config.debug_dir.as_deref(),
            Some(PathBuf::from("/tmp/chunks").as_path())
        );
        assert_eq!(config.download_timeout_secs, 30);
        assert_eq!(config.api_timeout_secs, 45);
        assert!(config.progress_callback.is_some());
    }

    #[test]
    fn debug_redacts_the_api_key() {
        let config = ExtractionConfig::builder()
            .api_key("sk-very-secret")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}

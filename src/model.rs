//! The model seam: one trait, one production client.
//!
//! [`ExtractionModel`] is what the orchestrator talks to — chunk bytes and
//! a prompt in, raw response text and token counts out. Keeping it a trait
//! object lets tests drive the whole pipeline with a scripted stand-in and
//! lets callers swap in their own transport without touching the pipeline.
//!
//! [`GeminiClient`] is the production implementation: a single
//! `generateContent` REST call per chunk, with the chunk riding along as an
//! `application/pdf` inline part. The request pins
//! `responseMimeType: application/json` and a response schema naming all
//! 13 fields in column order, which removes most — not all — of the
//! freestyle formatting the sanitizer exists for.
//!
//! There is deliberately no retry loop here: a failed call costs one chunk,
//! not the run, and the orchestrator's skip-and-continue policy is the
//! recovery strategy.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::ExtractError;
use crate::item::LineItem;

/// Model used when the config does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Published REST endpoint base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Env vars consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"];

/// What a model call produces: the raw text plus token accounting.
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Raw response text, exactly as the model produced it.
    pub text: String,
    /// Prompt-side token count reported by the API (0 if not reported).
    pub input_tokens: u32,
    /// Response-side token count reported by the API (0 if not reported).
    pub output_tokens: u32,
}

/// Why a model call produced no usable text.
///
/// Every variant folds into [`crate::error::ChunkError::Service`]; the
/// distinctions exist for log readability, not control flow.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Could not reach the API host.
    #[error("cannot reach the Gemini API: {0}")]
    Connection(String),

    /// The call exceeded the configured timeout.
    #[error("Gemini call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The request was sent but failed before a response body arrived.
    #[error("Gemini request failed: {0}")]
    Request(String),

    /// Non-2xx status from the API.
    #[error("Gemini API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// The API refused to answer (safety filter, blocked prompt).
    #[error("Gemini blocked the request: {reason}")]
    Blocked { reason: String },

    /// 2xx response with no text in any candidate.
    #[error("Gemini returned no text in its response")]
    EmptyResponse,

    /// 2xx response whose envelope did not deserialize.
    #[error("Gemini response envelope did not parse: {0}")]
    InvalidResponse(String),
}

/// A vision model that turns one PDF chunk into raw response text.
///
/// Implementations must be cheap to share behind an `Arc`; the orchestrator
/// calls them strictly sequentially, one chunk at a time.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Send one chunk and the extraction prompt; return the raw response.
    async fn extract_items(&self, pdf_bytes: &[u8], prompt: &str)
        -> Result<ModelReply, ModelError>;
}

// ── Gemini REST client ──────────────────────────────────────────────────────

/// Production [`ExtractionModel`] backed by the Gemini `generateContent`
/// REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Build a client with the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client init failed: {}", e)))?;
        Ok(GeminiClient {
            http,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            temperature: 0.0,
            max_output_tokens: 8192,
            timeout_secs: 120,
        })
    }

    /// Build a client from `GEMINI_API_KEY` / `GOOGLE_AI_API_KEY`.
    pub fn from_env() -> Result<Self, ExtractError> {
        for var in API_KEY_ENV_VARS {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    return Self::new(key);
                }
            }
        }
        Err(ExtractError::MissingApiKey {
            hint: api_key_hint(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// The hint attached to [`ExtractError::MissingApiKey`].
pub(crate) fn api_key_hint() -> String {
    format!(
        "Set {} (or {}), or pass the key explicitly via \
         ExtractionConfig / --api-key.",
        API_KEY_ENV_VARS[0], API_KEY_ENV_VARS[1]
    )
}

#[async_trait]
impl ExtractionModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn extract_items(
        &self,
        pdf_bytes: &[u8],
        prompt: &str,
    ) -> Result<ModelReply, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![
                    GeminiPart {
                        inline_data: Some(GeminiInlineData {
                            mime_type: "application/pdf",
                            data: BASE64_STANDARD.encode(pdf_bytes),
                        }),
                        text: None,
                    },
                    GeminiPart {
                        inline_data: None,
                        text: Some(prompt),
                    },
                ],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: item_response_schema(),
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else if e.is_connect() {
                    ModelError::Connection(e.to_string())
                } else {
                    ModelError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let envelope: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        let reply = reply_from(envelope)?;
        debug!(
            "gemini usage: {} prompt tokens, {} response tokens",
            reply.input_tokens, reply.output_tokens
        );
        Ok(reply)
    }
}

/// Response schema sent with every request: `{"items": [...13 string
/// fields...]}` with the fields required and ordered.
fn item_response_schema() -> Value {
    let properties: serde_json::Map<String, Value> = LineItem::FIELD_NAMES
        .iter()
        .map(|name| (name.to_string(), json!({ "type": "STRING" })))
        .collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": LineItem::FIELD_NAMES,
                    "propertyOrdering": LineItem::FIELD_NAMES,
                }
            }
        },
        "required": ["items"],
    })
}

/// Fold a decoded envelope into a [`ModelReply`].
fn reply_from(envelope: GeminiResponse) -> Result<ModelReply, ModelError> {
    if let Some(reason) = envelope
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ModelError::Blocked { reason });
    }

    let usage = envelope.usage_metadata.unwrap_or_default();
    let Some(candidate) = envelope.candidates.into_iter().next() else {
        return Err(ModelError::EmptyResponse);
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ModelError::Blocked {
            reason: "candidate finished with SAFETY".to_string(),
        });
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    Ok(ModelReply {
        text,
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    })
}

// ── Wire types ──────────────────────────────────────────────────────────────

/// Request body for `models/{model}:generateContent`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: Value,
}

/// Response body from `models/{model}:generateContent`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

//! Completion client: one call to the text-generation backend, wrapped in
//! retry, capped exponential backoff, and a one-time fallback-model
//! downgrade.
//!
//! The fallback decision is scoped to a single `complete` call. Concurrent
//! pipeline runs each own their retry state; one run degrading to the
//! fallback model never leaks into another.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{GenerationParams, RetryPolicy};

use super::Stage;

/// HTTP-like status codes that always warrant a retry.
const RETRYABLE_STATUSES: &[u16] = &[429, 502, 503, 504];

/// Message fragments that mark an error retryable regardless of status.
const RETRYABLE_FRAGMENTS: &[&str] = &[
    "timeout",
    "rate limit",
    "quota exceeded",
    "model is overloaded",
    "empty response",
];

/// A single failed generation attempt, before retry classification.
#[derive(Debug, Clone)]
pub struct AttemptError {
    pub status: Option<u16>,
    pub message: String,
}

impl AttemptError {
    fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Raw outcome of one generation attempt: the extracted text plus the
/// backend's block/finish annotations, needed to classify empty output.
#[derive(Debug, Clone, Default)]
pub struct GenerateOutcome {
    pub text: String,
    pub block_reason: Option<String>,
    pub finish_reason: Option<String>,
}

/// Seam between the retry loop and the concrete backend.
#[async_trait]
pub trait GenerateText: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerateOutcome, AttemptError>;
}

/// Terminal completion failure, surfaced after retry exhaustion or on the
/// first non-retryable error.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{stage}: model \"{model}\" is unavailable or does not support generation")]
    ModelUnavailable { stage: Stage, model: String },

    #[error("{stage}: generation service overloaded, retry later")]
    Overloaded { stage: Stage },

    #[error("{stage}: invalid generation request: {message}")]
    InvalidRequest { stage: Stage, message: String },

    #[error("{stage}: insufficient permissions for the generation service")]
    PermissionDenied { stage: Stage },

    #[error("{stage}: generation failed: {message}")]
    Unexpected { stage: Stage, message: String },
}

/// Retryable when the status is one of the fixed transient codes or the
/// message carries a known transient fragment (case-insensitive).
fn should_retry(error: &AttemptError) -> bool {
    if let Some(status) = error.status {
        if RETRYABLE_STATUSES.contains(&status) {
            return true;
        }
    }
    let lowered = error.message.to_lowercase();
    RETRYABLE_FRAGMENTS.iter().any(|f| lowered.contains(f))
}

/// Map a terminal attempt error onto the caller-facing taxonomy.
fn classify_terminal(error: AttemptError, stage: Stage, model: &str) -> CompletionError {
    match error.status {
        Some(404) => CompletionError::ModelUnavailable {
            stage,
            model: model.to_string(),
        },
        Some(429) | Some(503) => CompletionError::Overloaded { stage },
        Some(400) => CompletionError::InvalidRequest {
            stage,
            message: error.message,
        },
        Some(401) | Some(403) => CompletionError::PermissionDenied { stage },
        _ => CompletionError::Unexpected {
            stage,
            message: error.message,
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Retry loop
// ═══════════════════════════════════════════════════════════════════════════

/// Retry-wrapped completion client. Cheap to clone; the backend sits
/// behind an `Arc`.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn GenerateText>,
    primary_model: String,
    fallback_model: String,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(
        backend: Arc<dyn GenerateText>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
        params: GenerationParams,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            params,
            retry,
        }
    }

    /// Base generation parameters, for per-call overrides.
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// One completion call with the configured generation parameters.
    pub async fn complete(
        &self,
        prompt: &str,
        stage: Stage,
        caller: &str,
    ) -> Result<String, CompletionError> {
        self.complete_with(prompt, stage, caller, self.params.clone())
            .await
    }

    /// One completion call with per-call parameter overrides (used by the
    /// research stage, which wants a tight output cap).
    pub async fn complete_with(
        &self,
        prompt: &str,
        stage: Stage,
        caller: &str,
        params: GenerationParams,
    ) -> Result<String, CompletionError> {
        // Call-scoped retry state: model selection never outlives this call
        let mut model = self.primary_model.clone();
        let mut params = params;
        let mut fallback_engaged = false;
        let mut last_error: Option<AttemptError> = None;

        for attempt in 0..self.retry.max_attempts {
            let started = Instant::now();
            match self.backend.generate(&model, prompt, &params).await {
                Ok(outcome) => match extract_text(outcome) {
                    Ok(text) => {
                        tracing::debug!(
                            stage = %stage,
                            caller,
                            model = %model,
                            attempt = attempt + 1,
                            latency_ms = started.elapsed().as_millis() as u64,
                            response_len = text.len(),
                            "generation succeeded"
                        );
                        return Ok(text);
                    }
                    Err(empty) => {
                        last_error = Some(self.note_failure(
                            empty, attempt, stage, caller, &mut model, &mut params,
                            &mut fallback_engaged,
                        )?);
                    }
                },
                Err(error) => {
                    last_error = Some(self.note_failure(
                        error, attempt, stage, caller, &mut model, &mut params,
                        &mut fallback_engaged,
                    )?);
                }
            }

            if attempt + 1 < self.retry.max_attempts {
                tokio::time::sleep(self.retry.delay_for(attempt)).await;
            }
        }

        let last = last_error.unwrap_or_else(|| AttemptError::new(None, "no attempts were made"));
        tracing::warn!(stage = %stage, caller, model = %model, "generation retries exhausted");
        Err(classify_terminal(last, stage, &model))
    }

    /// Record a failed attempt. Non-retryable errors short-circuit with the
    /// classified terminal error; retryable ones may engage the fallback
    /// model (once, on the first retryable failure) and are returned for
    /// bookkeeping.
    #[allow(clippy::too_many_arguments)]
    fn note_failure(
        &self,
        error: AttemptError,
        attempt: u32,
        stage: Stage,
        caller: &str,
        model: &mut String,
        params: &mut GenerationParams,
        fallback_engaged: &mut bool,
    ) -> Result<AttemptError, CompletionError> {
        if !should_retry(&error) {
            tracing::warn!(
                stage = %stage,
                caller,
                model = %model,
                status = ?error.status,
                message = %error.message,
                "non-retryable generation failure"
            );
            return Err(classify_terminal(error, stage, model));
        }

        tracing::warn!(
            stage = %stage,
            caller,
            model = %model,
            attempt = attempt + 1,
            status = ?error.status,
            message = %error.message,
            "retryable generation failure"
        );

        if !*fallback_engaged && self.fallback_model != *model {
            *model = self.fallback_model.clone();
            *params = params.conservative();
            *fallback_engaged = true;
            tracing::info!(stage = %stage, caller, model = %model, "switched to fallback model");
        }

        Ok(error)
    }
}

/// Empty-output classification: a safety block and a length truncation get
/// distinct messages; plain emptiness is retryable by message fragment.
fn extract_text(outcome: GenerateOutcome) -> Result<String, AttemptError> {
    if !outcome.text.trim().is_empty() {
        return Ok(outcome.text);
    }
    if let Some(reason) = outcome.block_reason {
        return Err(AttemptError::new(
            None,
            format!("content blocked by safety filters ({reason})"),
        ));
    }
    if outcome.finish_reason.as_deref() == Some("MAX_TOKENS") {
        return Err(AttemptError::new(
            None,
            "response truncated before any text was produced (MAX_TOKENS)",
        ));
    }
    Err(AttemptError::new(None, "empty response from model"))
}

// ═══════════════════════════════════════════════════════════════════════════
// Gemini REST backend
// ═══════════════════════════════════════════════════════════════════════════

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Wall-clock bound per generation attempt. A tripped timeout surfaces as
/// a retryable "timeout" attempt error.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(45);

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Thin HTTP adapter for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl GenerateText for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerateOutcome, AttemptError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                max_output_tokens: params.max_output_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request timeout after {}s", REQUEST_TIMEOUT.as_secs())
                } else {
                    e.to_string()
                };
                AttemptError::new(e.status().map(|s| s.as_u16()), message)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AttemptError::new(Some(status.as_u16()), message));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::new(None, format!("malformed backend response: {e}")))?;

        let block_reason = parsed.prompt_feedback.and_then(|f| f.block_reason);
        let (text, finish_reason) = match parsed.candidates.into_iter().next() {
            Some(candidate) => {
                let text = candidate
                    .content
                    .map(|c| {
                        c.parts
                            .into_iter()
                            .map(|p| p.text)
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .unwrap_or_default();
                (text, candidate.finish_reason)
            }
            None => (String::new(), None),
        };

        Ok(GenerateOutcome {
            text,
            block_reason,
            finish_reason,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Scripted backend for tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
pub use mock::MockGenerator;

#[cfg(test)]
mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted [`GenerateText`] double: pops one pre-seeded result per
    /// call and records which model each call used.
    #[derive(Default)]
    pub struct MockGenerator {
        script: Mutex<VecDeque<Result<GenerateOutcome, AttemptError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_text(&self, text: &str) {
            self.push(Ok(GenerateOutcome {
                text: text.to_string(),
                ..GenerateOutcome::default()
            }));
        }

        pub fn push_failure(&self, status: Option<u16>, message: &str) {
            self.push(Err(AttemptError::new(status, message)));
        }

        pub fn push(&self, result: Result<GenerateOutcome, AttemptError>) {
            self.script.lock().unwrap().push_back(result);
        }

        /// Models used, one entry per generate call, in order.
        pub fn models_called(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerateText for MockGenerator {
        async fn generate(
            &self,
            model: &str,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<GenerateOutcome, AttemptError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AttemptError::new(None, "mock script exhausted")))
        }
    }
}

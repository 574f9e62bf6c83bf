//! Configuration types for question generation.
//!
//! Two structs, two lifetimes:
//!
//! * [`GenerationRequest`] — what the caller asks for on *this* run
//!   (questions per chunk, page selection, global cap). Validated on
//!   construction; a bad request never reaches the generator.
//! * [`GenerationConfig`] — how the pipeline talks to the model (sampling,
//!   retry, truncation, provider). Built once via
//!   [`GenerationConfigBuilder`] and shared across runs.

use crate::error::QuizForgeError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Hard cap on questions requested from a single generator call.
pub const MAX_QUESTIONS_PER_CALL: usize = 15;

/// Characters of chunk text sent to the model before truncation.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 3000;

/// Per-run generation parameters.
///
/// # Example
/// ```rust
/// use quizforge::GenerationRequest;
///
/// let req = GenerationRequest::new(5, Some("1-3,5".into()), Some(8)).unwrap();
/// assert_eq!(req.questions_per_chunk(), 5);
/// assert!(GenerationRequest::new(0, None, None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    questions_per_chunk: usize,
    page_spec: Option<String>,
    total_limit: Option<usize>,
}

impl GenerationRequest {
    /// Validate and build a request.
    ///
    /// `questions_per_chunk` must be positive and is clamped to
    /// [`MAX_QUESTIONS_PER_CALL`]. `total_limit`, when present, must be
    /// positive. A blank `page_spec` is treated as absent.
    pub fn new(
        questions_per_chunk: usize,
        page_spec: Option<String>,
        total_limit: Option<usize>,
    ) -> Result<Self, QuizForgeError> {
        if questions_per_chunk == 0 {
            return Err(QuizForgeError::InvalidRequest(
                "questions_per_chunk must be a positive integer".into(),
            ));
        }
        if total_limit == Some(0) {
            return Err(QuizForgeError::InvalidRequest(
                "total_limit must be a positive integer if provided".into(),
            ));
        }
        let questions_per_chunk = if questions_per_chunk > MAX_QUESTIONS_PER_CALL {
            warn!(
                "questions_per_chunk={} exceeds the per-call maximum; limiting to {}",
                questions_per_chunk, MAX_QUESTIONS_PER_CALL
            );
            MAX_QUESTIONS_PER_CALL
        } else {
            questions_per_chunk
        };
        let page_spec = page_spec.filter(|s| !s.trim().is_empty());
        Ok(Self {
            questions_per_chunk,
            page_spec,
            total_limit,
        })
    }

    pub fn questions_per_chunk(&self) -> usize {
        self.questions_per_chunk
    }

    pub fn page_spec(&self) -> Option<&str> {
        self.page_spec.as_deref()
    }

    pub fn total_limit(&self) -> Option<usize> {
        self.total_limit
    }
}

/// Pipeline configuration.
///
/// Built via [`GenerationConfig::builder()`] or [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use quizforge::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .temperature(0.2)
///     .max_attempts(3)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for question generation. Default: 0.2.
    ///
    /// Low values keep the model close to the requested JSON shape.
    pub temperature: f32,

    /// Nucleus sampling cutoff. Default: 0.9.
    pub top_p: f32,

    /// Maximum tokens per generator call. Default: 2000.
    ///
    /// Fifteen questions with explanations fit comfortably; much lower and
    /// the closing `]` gets cut off.
    pub max_tokens: usize,

    /// Attempts per batch, including the first. Default: 3.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds, doubled per retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Chunk text longer than this many characters is truncated. Default: 3000.
    pub max_chunk_chars: usize,

    /// Questions per generator call for single-block sources. Default: 15.
    pub max_batch_size: usize,

    /// Custom system prompt. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Temperature used by [`crate::generate::generate_study_material`]. Default: 0.7.
    pub study_temperature: f32,

    /// Optional per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            top_p: 0.9,
            max_tokens: 2000,
            max_attempts: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            max_batch_size: MAX_QUESTIONS_PER_CALL,
            system_prompt: None,
            study_temperature: 0.7,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("max_batch_size", &self.max_batch_size)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn Callback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_chunk_chars(mut self, n: usize) -> Self {
        self.config.max_chunk_chars = n;
        self
    }

    pub fn max_batch_size(mut self, n: usize) -> Self {
        self.config.max_batch_size = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn study_temperature(mut self, t: f32) -> Self {
        self.config.study_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, QuizForgeError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(QuizForgeError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.max_batch_size == 0 || c.max_batch_size > MAX_QUESTIONS_PER_CALL {
            return Err(QuizForgeError::InvalidConfig(format!(
                "max_batch_size must be 1–{}, got {}",
                MAX_QUESTIONS_PER_CALL, c.max_batch_size
            )));
        }
        if c.max_chunk_chars == 0 {
            return Err(QuizForgeError::InvalidConfig(
                "max_chunk_chars must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(QuizForgeError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_zero_counts() {
        assert!(matches!(
            GenerationRequest::new(0, None, None),
            Err(QuizForgeError::InvalidRequest(_))
        ));
        assert!(matches!(
            GenerationRequest::new(5, None, Some(0)),
            Err(QuizForgeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn request_clamps_per_chunk_to_fifteen() {
        let req = GenerationRequest::new(40, None, Some(40)).unwrap();
        assert_eq!(req.questions_per_chunk(), 15);
        assert_eq!(req.total_limit(), Some(40));
    }

    #[test]
    fn request_blank_page_spec_is_absent() {
        let req = GenerationRequest::new(3, Some("   ".into()), None).unwrap();
        assert_eq!(req.page_spec(), None);
    }

    #[test]
    fn config_defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.temperature, 0.2);
        assert_eq!(c.top_p, 0.9);
        assert_eq!(c.max_tokens, 2000);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.max_chunk_chars, 3000);
        assert_eq!(c.max_batch_size, 15);
    }

    #[test]
    fn builder_clamps_sampling() {
        let c = GenerationConfig::builder()
            .temperature(5.0)
            .top_p(1.5)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.top_p, 1.0);
    }

    #[test]
    fn builder_rejects_bad_limits() {
        assert!(GenerationConfig::builder().max_attempts(0).build().is_err());
        assert!(GenerationConfig::builder().max_batch_size(16).build().is_err());
        assert!(GenerationConfig::builder().max_batch_size(0).build().is_err());
        assert!(GenerationConfig::builder().max_chunk_chars(0).build().is_err());
    }
}

//! The external text-generation capability.
//!
//! The pipeline never talks to a provider SDK directly. It holds a
//! [`TextGenerator`] passed in by the caller, which makes every stage
//! testable with a scripted stub and keeps provider state out of globals.
//! [`LlmGenerator`] is the production implementation, backed by any
//! `edgequake_llm` provider.

use crate::config::GenerationConfig;
use crate::error::{GeneratorError, QuizForgeError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// One prompt-in, text-out request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: usize,
    pub top_p: f32,
}

/// Raw model output plus token accounting when the provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    /// A completion with no token accounting.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Prompt in, text out.
///
/// Implementations must be `Send + Sync`; one generator is shared by every
/// batch of a run and may be shared across runs.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, GeneratorError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, GeneratorError> {
        (**self).complete(request).await
    }
}

/// [`TextGenerator`] backed by an `edgequake_llm` chat provider.
#[derive(Clone)]
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Resolve a provider from `config` and the environment.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, QuizForgeError> {
        resolve_provider(config).map(Self::new)
    }
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("provider", &"<dyn LLMProvider>")
            .finish()
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, GeneratorError> {
        let messages = vec![
            ChatMessage::system(request.system),
            ChatMessage::user(request.prompt),
        ];
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

fn build_options(request: &CompletionRequest<'_>) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        top_p: Some(request.top_p),
        ..Default::default()
    }
}

/// Sort provider failures into coarse buckets for logging.
fn classify_provider_error(message: &str) -> GeneratorError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("rate limit") {
        GeneratorError::RateLimited(message.to_string())
    } else if lower.contains("400") || lower.contains("invalid request") {
        GeneratorError::Rejected(message.to_string())
    } else {
        GeneratorError::Provider(message.to_string())
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, QuizForgeError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        QuizForgeError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider` — a pre-built provider, used as-is.
/// 2. `config.provider_name` (+ `config.model`).
/// 3. `QUIZFORGE_LLM_PROVIDER` + `QUIZFORGE_MODEL`, when both are set.
/// 4. OpenAI, when `OPENAI_API_KEY` is set.
/// 5. `ProviderFactory::from_env` auto-detection.
pub fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, QuizForgeError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("QUIZFORGE_LLM_PROVIDER"),
        std::env::var("QUIZFORGE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| QuizForgeError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

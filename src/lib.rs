//! # quizforge
//!
//! Generate validated multiple-choice quiz questions from document text
//! using LLMs.
//!
//! ## Why this crate?
//!
//! Asking a model for "ten questions as JSON" works most of the time. The
//! rest of the time the reply is wrapped in prose, has a trailing comma, has
//! three options instead of four, or is simply short. This crate wraps the
//! call in a pipeline that repairs, validates, retries, and keeps an exact
//! question budget, so what reaches storage is always well-formed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SourceContent
//!  │
//!  ├─ 1. Select   page spec "1-3,5" → pages (paginated sources only)
//!  ├─ 2. Budget   per-page counts, or 15-question batches for single blocks
//!  ├─ 3. Prompt   truncate to 3000 chars, ask for exactly n questions
//!  ├─ 4. Call     TextGenerator with timeout + 3 attempts, backoff
//!  ├─ 5. Repair   strip prose/fences/trailing commas
//!  ├─ 6. Validate keep only 4-option questions with an A–D answer
//!  └─ 7. Output   QuestionRecords tagged with source id + page number
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizforge::{generate, GenerationConfig, GenerationRequest, LlmGenerator, SourceContent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::default();
//!     let generator = LlmGenerator::from_config(&config)?;
//!
//!     let content = SourceContent::Paginated(vec![
//!         "Mitochondria produce ATP through oxidative phosphorylation.".into(),
//!         "The Krebs cycle takes place in the mitochondrial matrix.".into(),
//!     ]);
//!     let request = GenerationRequest::new(5, Some("1-2".into()), Some(8))?;
//!
//!     let output = generate(&generator, &content, &request, "biology-101", &config).await?;
//!     for q in &output.questions {
//!         println!("p{} {} ({})", q.page_number, q.question_text, q.correct_answer);
//!     }
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `quizforge` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! quizforge = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod error;
pub mod generate;
pub mod generator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, GenerationRequest, MAX_QUESTIONS_PER_CALL};
pub use content::{SourceContent, SourceKind};
pub use error::{BatchError, GeneratorError, QuizForgeError, ValidationError};
pub use generate::{
    generate, generate_study_material, generate_sync, generate_to_file, write_questions,
};
pub use generator::{Completion, CompletionRequest, LlmGenerator, TextGenerator};
pub use output::{
    AnswerKey, BatchResult, ChunkResult, GenerationOutput, GenerationStats, QuestionDraft,
    QuestionRecord, SkipReason,
};
pub use pipeline::pages::{resolve as resolve_pages, select_pages};
pub use pipeline::repair::repair_malformed_array;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{commit_generation, CommitOutcome, JsonFileStore, MemoryStore, QuestionStore};

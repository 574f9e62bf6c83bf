//! Error types for the quizforge library.
//!
//! Three layers of failure, each with its own type:
//!
//! * [`QuizForgeError`] — **Fatal**: the run cannot start or its result
//!   cannot be committed (bad request, provider not configured, store
//!   rejected the records). Returned as `Err` from top-level entry points.
//!
//! * [`BatchError`] — **Non-fatal**: one call to the external generator
//!   failed after every attempt. Stored inside [`crate::output::BatchResult`]
//!   so a single bad batch never aborts the rest of the document.
//!
//! * [`GeneratorError`] / [`ValidationError`] — raised inside a batch and
//!   absorbed by the retry loop or by per-candidate filtering.
//!
//! An empty question list is *not* an error at the pipeline level. Callers
//! that want to treat it as one use
//! [`crate::output::GenerationOutput::into_result`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the quizforge library.
#[derive(Debug, Error)]
pub enum QuizForgeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Caller-supplied generation parameters are unusable. No external
    /// calls are made when this is returned.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A one-shot generator call (no retry layer) failed.
    #[error("Text generation failed: {0}")]
    Generation(#[from] GeneratorError),

    /// Every chunk was attempted and nothing valid came back.
    #[error("No questions generated for source '{source_id}' ({chunks} chunks attempted)")]
    NoQuestionsGenerated { source_id: String, chunks: usize },

    // ── Persistence errors ────────────────────────────────────────────────
    /// The store re-validated a record and refused the whole batch.
    #[error("Record {index} for source '{source_id}' failed validation: {reason}")]
    InvalidRecord {
        source_id: String,
        index: usize,
        reason: ValidationError,
    },

    /// The backing store could not be read or written.
    #[error("Storage error at '{path}': {detail}")]
    Storage { path: PathBuf, detail: String },

    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single batch.
///
/// The orchestrator logs it, records it on the batch result, and moves on
/// to the next chunk.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum BatchError {
    /// The provider call failed on the final attempt.
    #[error("provider call failed after {attempts} attempts: {detail}")]
    Provider { attempts: u32, detail: String },

    /// The provider did not answer within the per-call timeout.
    #[error("provider call timed out after {secs}s ({attempts} attempts)")]
    Timeout { attempts: u32, secs: u64 },

    /// The response could not be repaired into a JSON array.
    #[error("response was not a JSON array after {attempts} attempts: {detail}")]
    MalformedResponse { attempts: u32, detail: String },

    /// The response parsed but every candidate failed validation.
    #[error("no valid questions after {attempts} attempts")]
    NoValidQuestions { attempts: u32 },
}

/// Failure reported by a [`crate::generator::TextGenerator`].
///
/// The retry layer treats every variant the same way; the split exists for
/// logging and for the CLI's error messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Provider(String),
}

/// Why a candidate question was rejected by structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ValidationError {
    #[error("question is not a JSON object")]
    NotAnObject,

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("field {0} must be a non-empty string")]
    EmptyText(String),

    #[error("options must be an object")]
    OptionsNotAnObject,

    #[error("options must have keys A, B, C, D; got {0:?}")]
    BadOptionKeys(Vec<String>),

    #[error("option {0} must be a non-empty string")]
    EmptyOption(String),

    #[error("correct answer must be A, B, C, or D; got {0}")]
    BadAnswerKey(String),

    #[error("record belongs to source '{found}', expected '{expected}'")]
    WrongSource { expected: String, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_questions_display() {
        let e = QuizForgeError::NoQuestionsGenerated {
            source_id: "42".into(),
            chunks: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("'42'"), "got: {msg}");
        assert!(msg.contains("3 chunks"), "got: {msg}");
    }

    #[test]
    fn invalid_record_display_carries_reason() {
        let e = QuizForgeError::InvalidRecord {
            source_id: "doc".into(),
            index: 2,
            reason: ValidationError::MissingField("explanation".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("Record 2"));
        assert!(msg.contains("explanation"));
    }

    #[test]
    fn batch_error_display() {
        let e = BatchError::Timeout {
            attempts: 3,
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
        let e = BatchError::NoValidQuestions { attempts: 3 };
        assert!(e.to_string().contains("3 attempts"));
    }

    #[test]
    fn generator_error_converts_to_fatal() {
        let e: QuizForgeError = GeneratorError::RateLimited("429".into()).into();
        assert!(e.to_string().contains("rate limited"));
    }
}

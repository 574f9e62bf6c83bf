//! Result types produced by a generation run.
//!
//! [`QuestionRecord`] is the unit handed to persistence. Everything else
//! ([`BatchResult`], [`ChunkResult`], [`GenerationStats`]) is bookkeeping so
//! callers can see *why* a run came back short without parsing logs.

use crate::error::{BatchError, QuizForgeError, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the four option labels a question carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnswerKey {
    A,
    B,
    C,
    D,
}

impl AnswerKey {
    /// All labels in display order.
    pub const ALL: [AnswerKey; 4] = [AnswerKey::A, AnswerKey::B, AnswerKey::C, AnswerKey::D];

    /// Parse an exact, upper-case label. `"a"` and `"E"` are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(AnswerKey::A),
            "B" => Some(AnswerKey::B),
            "C" => Some(AnswerKey::C),
            "D" => Some(AnswerKey::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerKey::A => "A",
            AnswerKey::B => "B",
            AnswerKey::C => "C",
            AnswerKey::D => "D",
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated question that has not yet been tagged with provenance.
///
/// Produced by [`crate::pipeline::validate`]; turned into a
/// [`QuestionRecord`] by the orchestrator once the page is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question_text: String,
    pub options: BTreeMap<AnswerKey, String>,
    pub correct_answer: AnswerKey,
    pub explanation: String,
}

impl QuestionDraft {
    /// Attach provenance.
    pub fn into_record(self, source_id: &str, page_number: usize) -> QuestionRecord {
        QuestionRecord {
            question_text: self.question_text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            source_id: source_id.to_string(),
            page_number,
        }
    }
}

/// A multiple-choice question ready for persistence.
///
/// Serialises as
/// `{"question_text", "options": {"A".."D"}, "correct_answer", "explanation", "source_id", "page_number"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question_text: String,
    pub options: BTreeMap<AnswerKey, String>,
    pub correct_answer: AnswerKey,
    pub explanation: String,
    pub source_id: String,
    /// 1-indexed; always 1 for single-block sources.
    pub page_number: usize,
}

impl QuestionRecord {
    /// Re-check the structural invariants on an already-typed record.
    ///
    /// Typed records cannot carry a bad key, but they can still be built by
    /// hand with a missing option or blank text, so stores call this before
    /// commit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.question_text.trim().is_empty() {
            return Err(ValidationError::EmptyText("question_text".into()));
        }
        if self.explanation.trim().is_empty() {
            return Err(ValidationError::EmptyText("explanation".into()));
        }
        if self.options.len() != AnswerKey::ALL.len() {
            return Err(ValidationError::BadOptionKeys(
                self.options.keys().map(|k| k.to_string()).collect(),
            ));
        }
        for (key, text) in &self.options {
            if text.trim().is_empty() {
                return Err(ValidationError::EmptyOption(key.to_string()));
            }
        }
        if !self.options.contains_key(&self.correct_answer) {
            return Err(ValidationError::BadAnswerKey(self.correct_answer.to_string()));
        }
        if self.page_number == 0 {
            return Err(ValidationError::MissingField("page_number".into()));
        }
        Ok(())
    }
}

/// Outcome of one call to the single-batch procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Questions asked for.
    pub requested: usize,
    /// Accepted questions, at most `requested`.
    pub questions: Vec<QuestionDraft>,
    /// Attempts consumed (1..=max_attempts).
    pub attempts: u32,
    /// Candidates dropped by validation across all attempts.
    pub rejected: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Set when the batch produced nothing.
    pub error: Option<BatchError>,
}

impl BatchResult {
    pub fn is_short(&self) -> bool {
        self.questions.len() < self.requested
    }
}

/// Per-chunk summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 1-indexed page number (1 for single-block sources).
    pub page_number: usize,
    pub requested: usize,
    /// Records actually kept after global-limit truncation.
    pub accepted: usize,
    pub batches: Vec<BatchResult>,
    /// Set when the chunk was skipped without calling the generator.
    pub skipped: Option<SkipReason>,
}

/// Why a chunk was not sent to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    EmptyText,
    BudgetExhausted,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Chunks selected for processing.
    pub selected_chunks: usize,
    /// Chunks that contributed at least one question.
    pub productive_chunks: usize,
    pub skipped_chunks: usize,
    /// Chunks that were attempted and yielded nothing.
    pub failed_chunks: usize,
    pub total_batches: usize,
    pub total_attempts: u64,
    pub rejected_candidates: usize,
    pub requested_questions: usize,
    pub total_questions: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Complete result of [`crate::generate::generate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub source_id: String,
    pub questions: Vec<QuestionRecord>,
    pub chunks: Vec<ChunkResult>,
    pub stats: GenerationStats,
}

impl GenerationOutput {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Treat an empty run as an error.
    pub fn into_result(self) -> Result<Self, QuizForgeError> {
        if self.questions.is_empty() {
            return Err(QuizForgeError::NoQuestionsGenerated {
                source_id: self.source_id,
                chunks: self.stats.selected_chunks,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> QuestionRecord {
        QuestionRecord {
            question_text: "What is 2 + 2?".into(),
            options: AnswerKey::ALL
                .iter()
                .zip(["3", "4", "5", "22"])
                .map(|(k, v)| (*k, v.to_string()))
                .collect(),
            correct_answer: AnswerKey::B,
            explanation: "Basic arithmetic.".into(),
            source_id: "s1".into(),
            page_number: 1,
        }
    }

    #[test]
    fn answer_key_parse_is_strict() {
        assert_eq!(AnswerKey::parse("C"), Some(AnswerKey::C));
        assert_eq!(AnswerKey::parse("c"), None);
        assert_eq!(AnswerKey::parse("E"), None);
        assert_eq!(AnswerKey::parse(" A"), None);
    }

    #[test]
    fn record_serialises_with_letter_keys() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["options"]["B"], "4");
        assert_eq!(json["correct_answer"], "B");
        assert_eq!(json["page_number"], 1);
        let back: QuestionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record());
    }

    #[test]
    fn record_validate_catches_hand_built_defects() {
        assert!(record().validate().is_ok());

        let mut r = record();
        r.options.remove(&AnswerKey::D);
        assert!(matches!(r.validate(), Err(ValidationError::BadOptionKeys(_))));

        let mut r = record();
        r.explanation = "  ".into();
        assert_eq!(
            r.validate(),
            Err(ValidationError::EmptyText("explanation".into()))
        );

        let mut r = record();
        r.page_number = 0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn empty_output_into_result_errors() {
        let out = GenerationOutput {
            source_id: "x".into(),
            questions: vec![],
            chunks: vec![],
            stats: GenerationStats {
                selected_chunks: 2,
                ..Default::default()
            },
        };
        assert!(matches!(
            out.into_result(),
            Err(QuizForgeError::NoQuestionsGenerated { chunks: 2, .. })
        ));
    }
}

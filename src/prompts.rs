//! Prompts for question generation and study-material generation.
//!
//! Every prompt lives here so wording changes never touch retry or
//! validation code, and tests can inspect prompts without a model.
//!
//! Callers can override the system prompt via
//! [`crate::config::GenerationConfig::system_prompt`]; the user prompt is
//! always built by [`question_prompt`] because the validator depends on its
//! output contract.

/// Default system prompt. `{n}` is replaced with the requested count.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert question generator. \
You MUST generate exactly {n} multiple-choice questions in valid JSON format. \
Each question must have exactly 4 options (A, B, C, D) and one correct answer. \
Return only a valid JSON array, no other text.";

/// Example element shown to the model. Kept in sync with
/// [`crate::pipeline::validate`].
const EXAMPLE_QUESTION: &str = r#"[
  {
    "question_text": "What is the main topic discussed in the text?",
    "options": {
      "A": "First option",
      "B": "Second option",
      "C": "Third option",
      "D": "Fourth option"
    },
    "correct_answer": "B",
    "explanation": "The text states that the main topic is the second option."
  }
]"#;

/// Render the system prompt for a batch of `n` questions.
pub fn system_prompt(template: Option<&str>, n: usize) -> String {
    template
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .replace("{n}", &n.to_string())
}

/// Build the user prompt asking for exactly `n` questions about `text`.
///
/// `text` should already be truncated by
/// [`crate::pipeline::chunk::truncate_chunk`].
pub fn question_prompt(text: &str, n: usize) -> String {
    format!(
        r#"Based on the following text, generate EXACTLY {n} multiple-choice questions.

REQUIREMENTS:
1. Generate exactly {n} questions, no more and no fewer
2. Each question has exactly 4 options labeled A, B, C and D
3. Each question has exactly one correct answer (A, B, C or D)
4. Each question includes a brief explanation of the correct answer
5. Test comprehension, analysis, or key facts from the text
6. Avoid questions that are trivially obvious or hopelessly obscure
7. Make incorrect options plausible but clearly wrong
8. Do not repeat questions
9. Do not ask about program output unless the text contains code

RESPONSE FORMAT:
- Return ONLY a JSON array
- No markdown, no code fences, no text before or after the array

Example element format:
{EXAMPLE_QUESTION}

TEXT TO ANALYZE:
{text}

Generate exactly {n} questions as a JSON array:"#
    )
}

/// System prompt for study-material generation.
pub const STUDY_SYSTEM_PROMPT: &str =
    "You are an educational content generator. Write clear, factual study material.";

/// Prompt for generating study material about a title.
pub fn study_material_prompt(title: &str) -> String {
    format!(
        "Generate comprehensive educational content about {title}. \
The content should be detailed, well-structured, and suitable for creating quiz questions. \
Cover the key concepts in depth but do not write any quiz questions. \
Do not use markdown."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_substitutes_count() {
        let p = system_prompt(None, 7);
        assert!(p.contains("exactly 7 multiple-choice"));
        assert!(!p.contains("{n}"));
    }

    #[test]
    fn custom_system_prompt_template() {
        assert_eq!(system_prompt(Some("Make {n} items"), 3), "Make 3 items");
        assert_eq!(system_prompt(Some("No count"), 3), "No count");
    }

    #[test]
    fn question_prompt_carries_text_and_count() {
        let p = question_prompt("Photosynthesis converts light.", 4);
        assert!(p.contains("EXACTLY 4 multiple-choice"));
        assert!(p.contains("Photosynthesis converts light."));
        assert!(p.contains("\"correct_answer\""));
    }

    #[test]
    fn study_prompt_mentions_title() {
        let p = study_material_prompt("Plate tectonics");
        assert!(p.contains("Plate tectonics"));
        assert!(p.contains("do not write any quiz questions"));
    }
}

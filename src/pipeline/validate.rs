//! Structural validation of generator output.
//!
//! Each element of the parsed array is checked on its own; one bad element
//! never sinks its siblings. Checks run in a fixed order so the reported
//! [`ValidationError`] is stable for a given input.

use crate::error::ValidationError;
use crate::output::{AnswerKey, QuestionDraft};
use crate::pipeline::repair::repair_malformed_array;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const REQUIRED_FIELDS: [&str; 4] = ["question_text", "options", "correct_answer", "explanation"];

/// Repair and parse a raw response into candidate elements.
///
/// Returns `Err` with a short description when the repaired text is not
/// JSON or is JSON but not an array.
pub fn parse_candidates(raw: &str) -> Result<Vec<Value>, String> {
    let repaired = repair_malformed_array(raw);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(format!("expected a JSON array, got {}", json_kind(&other))),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate one candidate and convert it to a [`QuestionDraft`].
///
/// Text fields are trimmed on the way in. Extra fields on the object are
/// ignored; extra keys inside `options` are not.
pub fn validate_candidate(value: &Value) -> Result<QuestionDraft, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            return Err(ValidationError::MissingField(field.to_string()));
        }
    }

    let options = obj["options"]
        .as_object()
        .ok_or(ValidationError::OptionsNotAnObject)?;
    let options = validate_options(options)?;

    let correct_answer = match &obj["correct_answer"] {
        Value::String(s) => AnswerKey::parse(s).ok_or_else(|| ValidationError::BadAnswerKey(s.clone()))?,
        other => return Err(ValidationError::BadAnswerKey(other.to_string())),
    };

    let question_text = non_empty_text(obj, "question_text")?;
    let explanation = non_empty_text(obj, "explanation")?;

    Ok(QuestionDraft {
        question_text,
        options,
        correct_answer,
        explanation,
    })
}

fn validate_options(
    options: &Map<String, Value>,
) -> Result<BTreeMap<AnswerKey, String>, ValidationError> {
    let keys_ok = options.len() == AnswerKey::ALL.len()
        && AnswerKey::ALL.iter().all(|k| options.contains_key(k.as_str()));
    if !keys_ok {
        let mut got: Vec<String> = options.keys().cloned().collect();
        got.sort();
        return Err(ValidationError::BadOptionKeys(got));
    }

    let mut out = BTreeMap::new();
    for key in AnswerKey::ALL {
        match options[key.as_str()].as_str().map(str::trim) {
            Some(text) if !text.is_empty() => {
                out.insert(key, text.to_string());
            }
            _ => return Err(ValidationError::EmptyOption(key.to_string())),
        }
    }
    Ok(out)
}

fn non_empty_text(obj: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match obj[field].as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::EmptyText(field.to_string())),
    }
}

/// Result of validating a whole response.
#[derive(Debug, Default)]
pub struct Validated {
    pub accepted: Vec<QuestionDraft>,
    /// `(position in response, reason)` for every dropped element.
    pub rejected: Vec<(usize, ValidationError)>,
}

/// Validate every element, keeping the valid ones in response order.
pub fn validate_all(items: &[Value]) -> Validated {
    let mut out = Validated::default();
    for (i, item) in items.iter().enumerate() {
        match validate_candidate(item) {
            Ok(q) => out.accepted.push(q),
            Err(e) => out.rejected.push((i, e)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "question_text": "What colour is the sky?",
            "options": {"A": "Green", "B": "Blue", "C": "Red", "D": "Black"},
            "correct_answer": "B",
            "explanation": "Rayleigh scattering."
        })
    }

    #[test]
    fn accepts_well_formed_question() {
        let q = validate_candidate(&valid()).unwrap();
        assert_eq!(q.correct_answer, AnswerKey::B);
        assert_eq!(q.options[&AnswerKey::B], "Blue");
    }

    #[test]
    fn rejects_missing_explanation() {
        let mut v = valid();
        v.as_object_mut().unwrap().remove("explanation");
        assert_eq!(
            validate_candidate(&v),
            Err(ValidationError::MissingField("explanation".into()))
        );
    }

    #[test]
    fn rejects_three_options() {
        let mut v = valid();
        v["options"] = json!({"A": "x", "B": "y", "C": "z"});
        assert_eq!(
            validate_candidate(&v),
            Err(ValidationError::BadOptionKeys(vec!["A".into(), "B".into(), "C".into()]))
        );
    }

    #[test]
    fn rejects_extra_or_lowercase_option_keys() {
        let mut v = valid();
        v["options"] = json!({"A": "w", "B": "x", "C": "y", "D": "z", "E": "extra"});
        assert!(matches!(validate_candidate(&v), Err(ValidationError::BadOptionKeys(_))));

        v["options"] = json!({"a": "w", "b": "x", "c": "y", "d": "z"});
        assert!(matches!(validate_candidate(&v), Err(ValidationError::BadOptionKeys(_))));
    }

    #[test]
    fn rejects_answer_outside_a_to_d() {
        let mut v = valid();
        v["correct_answer"] = json!("E");
        assert_eq!(
            validate_candidate(&v),
            Err(ValidationError::BadAnswerKey("E".into()))
        );
        v["correct_answer"] = json!(2);
        assert!(matches!(validate_candidate(&v), Err(ValidationError::BadAnswerKey(_))));
    }

    #[test]
    fn rejects_blank_text_and_options() {
        let mut v = valid();
        v["question_text"] = json!("   ");
        assert_eq!(
            validate_candidate(&v),
            Err(ValidationError::EmptyText("question_text".into()))
        );

        let mut v = valid();
        v["options"]["C"] = json!("");
        assert_eq!(
            validate_candidate(&v),
            Err(ValidationError::EmptyOption("C".into()))
        );

        let mut v = valid();
        v["options"]["D"] = json!(4);
        assert_eq!(
            validate_candidate(&v),
            Err(ValidationError::EmptyOption("D".into()))
        );
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(validate_candidate(&json!("q")), Err(ValidationError::NotAnObject));
        let mut v = valid();
        v["options"] = json!(["A", "B", "C", "D"]);
        assert_eq!(validate_candidate(&v), Err(ValidationError::OptionsNotAnObject));
    }

    #[test]
    fn bad_siblings_do_not_sink_valid_ones() {
        let mut missing = valid();
        missing.as_object_mut().unwrap().remove("explanation");
        let mut three = valid();
        three["options"] = json!({"A": "x", "B": "y", "C": "z"});
        let mut bad_key = valid();
        bad_key["correct_answer"] = json!("E");

        let items = vec![valid(), missing, three, valid(), bad_key];
        let out = validate_all(&items);
        assert_eq!(out.accepted.len(), 2);
        let positions: Vec<usize> = out.rejected.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![1, 2, 4]);
    }

    #[test]
    fn parse_candidates_repairs_then_requires_array() {
        let raw = format!("Here you go:\n```json\n[{},]\n```", valid());
        assert_eq!(parse_candidates(&raw).unwrap().len(), 1);

        assert!(parse_candidates("I cannot help with that.").is_err());
        let err = parse_candidates(r#"{"question_text": "x"}"#).unwrap_err();
        assert!(err.contains("an object"), "got: {err}");
    }
}

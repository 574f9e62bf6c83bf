//! Response repair: best-effort normalisation of generator output into
//! something `serde_json` can parse as an array of question objects.
//!
//! Models asked for "only a JSON array" still wrap it in prose, in
//! ` ```json ` fences, or leave a trailing comma after the last element.
//! [`repair_malformed_array`] fixes those three cases and nothing else.
//!
//! ## Limits
//!
//! This is a heuristic, not a parser:
//!
//! - single-quoted strings are left alone and will still fail to parse;
//! - the trailing-comma and whitespace passes also run inside string
//!   literals, so `"a,  ]"` becomes `"a ]"` and newlines inside strings
//!   become spaces;
//! - a response cut off mid-array is sliced to its last `]`, which usually
//!   still fails to parse and is retried upstream.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all repair passes in order:
///
/// 1. Slice from the first `[` that opens an array of objects through its
///    matching `]`, dropping surrounding prose and fences
/// 2. Remove trailing commas before `}` or `]`
/// 3. Collapse runs of whitespace to a single space and trim
pub fn repair_malformed_array(text: &str) -> String {
    let s = extract_object_array(text);
    let s = strip_trailing_commas(s);
    collapse_whitespace(&s)
}

// ── Pass 1: Extract the object array ─────────────────────────────────────────

/// Byte offset of the first `[` whose next non-whitespace character is `{`.
fn find_array_start(text: &str) -> Option<usize> {
    text.char_indices()
        .filter(|&(_, c)| c == '[')
        .map(|(i, _)| i)
        .find(|&i| text[i + 1..].trim_start().starts_with('{'))
}

/// Byte offset one past the `]` that closes the array opened at `start`.
///
/// Tracks double-quoted strings (with escapes) so brackets inside question
/// text don't count.
fn find_matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (c == ']').then_some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_object_array(text: &str) -> &str {
    let Some(start) = find_array_start(text) else {
        return text.trim();
    };
    if let Some(end) = find_matching_close(text, start) {
        return &text[start..end];
    }
    // Unbalanced: take up to the last `]`, or everything if there is none.
    match text[start..].rfind(']') {
        Some(rel) => &text[start..start + rel + 1],
        None => &text[start..],
    }
}

// ── Pass 2: Trailing commas ─────────────────────────────────────────────────

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

fn strip_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "$1").into_owned()
}

// ── Pass 3: Whitespace ───────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parses_as_array(s: &str) -> bool {
        matches!(serde_json::from_str::<Value>(s), Ok(Value::Array(_)))
    }

    #[test]
    fn clean_array_passes_through() {
        let input = r#"[{"a": 1}, {"b": 2}]"#;
        assert_eq!(repair_malformed_array(input), input);
    }

    #[test]
    fn strips_leading_and_trailing_prose() {
        let input = "Sure! Here are your questions:\n[{\"a\": 1}]\nLet me know if you need more.";
        assert_eq!(repair_malformed_array(input), r#"[{"a": 1}]"#);
    }

    #[test]
    fn strips_markdown_fences() {
        let input = "```json\n[\n  {\"a\": 1}\n]\n```";
        assert_eq!(repair_malformed_array(input), r#"[ {"a": 1} ]"#);
        assert!(parses_as_array(&repair_malformed_array(input)));
    }

    #[test]
    fn trailing_commentary_with_brackets_is_dropped() {
        // A greedy first-`[`-to-last-`]` slice would swallow "[1]" here.
        let input = r#"[{"q": "x"}] Note: see [1] for details."#;
        assert_eq!(repair_malformed_array(input), r#"[{"q": "x"}]"#);
    }

    #[test]
    fn leading_bracketed_prose_is_skipped() {
        let input = r#"[Answer follows] [{"q": "x"}]"#;
        assert_eq!(repair_malformed_array(input), r#"[{"q": "x"}]"#);
    }

    #[test]
    fn brackets_inside_strings_do_not_close_the_array() {
        let input = r#"[{"q": "What does ] mean in [regex]?"}] trailing"#;
        let out = repair_malformed_array(input);
        assert!(parses_as_array(&out), "got: {out}");
        assert!(!out.contains("trailing"));
    }

    #[test]
    fn escaped_quotes_are_handled() {
        let input = r#"[{"q": "He said \"]\" loudly"}] done"#;
        let out = repair_malformed_array(input);
        assert!(parses_as_array(&out), "got: {out}");
    }

    #[test]
    fn removes_trailing_commas() {
        let input = r#"[{"a": 1, "b": {"c": 2,},},]"#;
        let out = repair_malformed_array(input);
        assert_eq!(out, r#"[{"a": 1, "b": {"c": 2}}]"#);
        assert!(parses_as_array(&out));
    }

    #[test]
    fn collapses_whitespace() {
        let input = "[\n\n  {\"a\":\t1}\r\n]";
        assert_eq!(repair_malformed_array(input), r#"[ {"a": 1} ]"#);
    }

    #[test]
    fn single_quotes_are_not_repaired() {
        let input = "[{'question_text': 'x'}]";
        let out = repair_malformed_array(input);
        assert_eq!(out, input);
        assert!(serde_json::from_str::<Value>(&out).is_err());
    }

    #[test]
    fn truncated_array_is_sliced_to_last_bracket() {
        let input = r#"[{"a": [1, 2]}, {"b": "#;
        assert_eq!(repair_malformed_array(input), r#"[{"a": [1, 2]"#);
    }

    #[test]
    fn no_object_array_returns_trimmed_input() {
        assert_eq!(repair_malformed_array("  no json here  "), "no json here");
        assert_eq!(repair_malformed_array(" [1, 2] "), "[1, 2]");
    }
}

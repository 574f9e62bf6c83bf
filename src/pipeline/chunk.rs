//! Chunk preparation: truncation before prompting and batch planning for
//! single-block sources.

use std::borrow::Cow;

/// Appended to chunk text that was cut short.
pub const TRUNCATION_MARKER: &str = "...";

/// Truncate `text` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] if anything was removed.
///
/// Counts Unicode scalar values, not bytes, so multi-byte text is never
/// split inside a character.
pub fn truncate_chunk(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(TRUNCATION_MARKER);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    }
}

/// Number of generator calls needed for `target` questions at `batch_size`
/// per call: `batch_count(40, 15) == 3`. The orchestrator sizes each batch
/// from what is still missing.
pub fn batch_count(target: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    target.div_ceil(batch_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_borrowed() {
        let t = truncate_chunk("hello", 10);
        assert!(matches!(t, Cow::Borrowed("hello")));
        assert_eq!(truncate_chunk("hello", 5), "hello");
    }

    #[test]
    fn long_text_gets_marker() {
        assert_eq!(truncate_chunk("abcdefgh", 3), "abc...");
    }

    #[test]
    fn truncation_counts_characters() {
        let text = "é".repeat(3001);
        let t = truncate_chunk(&text, 3000);
        assert_eq!(t.chars().count(), 3000 + TRUNCATION_MARKER.len());
        assert!(t.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn counts_fifteen_question_batches() {
        assert_eq!(batch_count(40, 15), 3);
        assert_eq!(batch_count(45, 15), 3);
        assert_eq!(batch_count(7, 15), 1);
        assert_eq!(batch_count(16, 15), 2);
        assert_eq!(batch_count(0, 15), 0);
    }

    #[test]
    fn huge_target_is_counted_without_allocating() {
        assert_eq!(batch_count(usize::MAX, 15), usize::MAX / 15);
        assert_eq!(batch_count(usize::MAX - 1, 16), usize::MAX / 16 + 1);
        assert_eq!(batch_count(usize::MAX, 1), usize::MAX);
    }
}

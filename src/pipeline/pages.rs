//! Page selection: turn a human-entered spec like `"1-3,5"` into page indices.
//!
//! The spec is a comma-separated list of 1-indexed pages (`N`) or inclusive
//! ranges (`N-M`). Output is 0-indexed, deduplicated, ascending.
//!
//! Two failure modes, both non-fatal:
//!
//! * a malformed token discards the whole spec ([`resolve`] returns empty);
//! * indices past the document end are dropped one by one.
//!
//! [`select_pages`] turns "nothing usable" into "all pages", which is what
//! the orchestrator wants.

use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// One comma-separated element of a page spec, still 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Single(i64),
    /// Inclusive on both ends.
    Range(i64, i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageSpecError {
    #[error("malformed page token '{0}'")]
    MalformedToken(String),
}

/// Parse a spec into tokens without bounds checking.
///
/// Whitespace around tokens and around the `-` of a range is allowed. Empty
/// tokens (`"1,,3"`), negative numbers and `"1-2-3"` are malformed. A range
/// whose end precedes its start parses fine and contributes no pages.
pub fn parse_spec(spec: &str) -> Result<Vec<PageToken>, PageSpecError> {
    spec.split(',').map(parse_token).collect()
}

fn parse_token(raw: &str) -> Result<PageToken, PageSpecError> {
    let token = raw.trim();
    let malformed = || PageSpecError::MalformedToken(token.to_string());

    if token.contains('-') {
        let mut parts = token.split('-');
        let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let start = parse_number(start).ok_or_else(malformed)?;
        let end = parse_number(end).ok_or_else(malformed)?;
        Ok(PageToken::Range(start, end))
    } else {
        parse_number(token).map(PageToken::Single).ok_or_else(malformed)
    }
}

fn parse_number(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Resolve a spec against a document with `available` pages.
///
/// * `None` or blank → every page.
/// * Malformed → empty, with a warning.
/// * Out-of-range indices are dropped with a warning; the result may be
///   empty if nothing was in range.
pub fn resolve(spec: Option<&str>, available: usize) -> Vec<usize> {
    let spec = match spec.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return (0..available).collect(),
    };

    let tokens = match parse_spec(spec) {
        Ok(t) => t,
        Err(e) => {
            warn!("Invalid page range string '{}': {}", spec, e);
            return Vec::new();
        }
    };

    let last = available as i64 - 1;
    let mut selected = BTreeSet::new();
    let mut dropped: u64 = 0;

    for token in tokens {
        let (lo, hi) = match token {
            PageToken::Single(n) => (n - 1, n - 1),
            PageToken::Range(start, end) => (start - 1, end - 1),
        };
        if lo > hi {
            warn!("Page range {}-{} is reversed; it selects nothing", lo + 1, hi + 1);
            continue;
        }
        // Only walk the part that overlaps [0, last]; huge ranges stay cheap.
        let in_lo = lo.max(0);
        let in_hi = hi.min(last);
        let span = hi.saturating_sub(lo).saturating_add(1) as u64;
        if in_lo > in_hi {
            dropped = dropped.saturating_add(span);
            continue;
        }
        dropped = dropped.saturating_add(span - (in_hi - in_lo + 1) as u64);
        selected.extend((in_lo..=in_hi).map(|i| i as usize));
    }

    if dropped > 0 {
        warn!(
            "{} page(s) in '{}' are out of bounds (document has {} pages); keeping valid pages only",
            dropped, spec, available
        );
    }

    selected.into_iter().collect()
}

/// Resolve with fallback: if the spec yields nothing, process every page.
pub fn select_pages(spec: Option<&str>, available: usize) -> Vec<usize> {
    let resolved = resolve(spec, available);
    if resolved.is_empty() && available > 0 {
        if let Some(s) = spec {
            warn!(
                "No valid pages to process from '{}'; processing all {} pages",
                s, available
            );
        }
        return (0..available).collect();
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_and_singles_merge() {
        assert_eq!(resolve(Some("1-3,5"), 10), vec![0, 1, 2, 4]);
    }

    #[test]
    fn empty_spec_means_all_pages() {
        assert_eq!(resolve(Some(""), 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(resolve(None, 3), vec![0, 1, 2]);
        assert_eq!(resolve(Some("   "), 2), vec![0, 1]);
    }

    #[test]
    fn malformed_spec_is_discarded_entirely() {
        assert_eq!(resolve(Some("abc"), 5), Vec::<usize>::new());
        assert_eq!(resolve(Some("1,x,3"), 5), Vec::<usize>::new());
        assert_eq!(resolve(Some("1-2-3"), 5), Vec::<usize>::new());
        assert_eq!(resolve(Some("1,,3"), 5), Vec::<usize>::new());
        assert_eq!(resolve(Some("-2"), 5), Vec::<usize>::new());
        assert_eq!(resolve(Some("1-"), 5), Vec::<usize>::new());
    }

    #[test]
    fn out_of_bounds_indices_are_dropped() {
        assert_eq!(resolve(Some("1-20"), 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(resolve(Some("0,2,99"), 5), vec![1]);
        assert_eq!(resolve(Some("7-9"), 5), Vec::<usize>::new());
    }

    #[test]
    fn duplicates_collapse_and_sort() {
        assert_eq!(resolve(Some("5,1-3,2,5"), 10), vec![0, 1, 2, 4]);
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert_eq!(resolve(Some(" 2 - 3 , 1 "), 5), vec![0, 1, 2]);
    }

    #[test]
    fn reversed_range_selects_nothing() {
        assert_eq!(resolve(Some("4-2"), 5), Vec::<usize>::new());
        assert_eq!(resolve(Some("4-2,1"), 5), vec![0]);
    }

    #[test]
    fn huge_range_does_not_allocate_per_page() {
        assert_eq!(resolve(Some("1-9000000000"), 3), vec![0, 1, 2]);
        let three_huge = "1-9000000000000000000,1-9000000000000000000,1-9000000000000000000";
        assert_eq!(resolve(Some(three_huge), 3), vec![0, 1, 2]);
        assert!(resolve(Some("9000000000000000000,4-9000000000000000000,5-9000000000000000000"), 3).is_empty());
    }

    #[test]
    fn select_pages_falls_back_to_all() {
        assert_eq!(select_pages(Some("abc"), 3), vec![0, 1, 2]);
        assert_eq!(select_pages(Some("8-9"), 3), vec![0, 1, 2]);
        assert_eq!(select_pages(Some("2"), 3), vec![1]);
        assert_eq!(select_pages(Some("2"), 0), Vec::<usize>::new());
    }

    #[test]
    fn parse_spec_reports_offending_token() {
        assert_eq!(
            parse_spec("1, two"),
            Err(PageSpecError::MalformedToken("two".into()))
        );
        assert_eq!(
            parse_spec("3-4"),
            Ok(vec![PageToken::Range(3, 4)])
        );
    }
}

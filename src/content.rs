//! Source content handed to the pipeline by the text-extraction layer.
//!
//! Extraction itself (PDF parsing, DOCX/PPTX unpacking, transcript fetching)
//! happens upstream. What arrives here is either a list of page texts or a
//! failure sentinel (`None`). The pipeline branches on [`SourceContent`],
//! never on a format name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The upload formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    Pdf,
    Docx,
    Pptx,
    Txt,
    Youtube,
}

impl SourceKind {
    /// Whether page numbers from this kind are meaningful to a reader.
    pub fn is_paginated(&self) -> bool {
        matches!(self, SourceKind::Pdf)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "PDF",
            SourceKind::Docx => "DOCX",
            SourceKind::Pptx => "PPTX",
            SourceKind::Txt => "TXT",
            SourceKind::Youtube => "YOUTUBE",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "docx" => Ok(SourceKind::Docx),
            "pptx" => Ok(SourceKind::Pptx),
            "txt" | "text" => Ok(SourceKind::Txt),
            "youtube" | "yt" => Ok(SourceKind::Youtube),
            other => Err(format!(
                "unknown source kind '{other}' (expected pdf, docx, pptx, txt, youtube)"
            )),
        }
    }
}

/// Text of one source, in the shape the generator consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceContent {
    /// One entry per page; index = page number − 1. Blank pages are kept
    /// so numbering stays aligned with the original document.
    Paginated(Vec<String>),
    /// The whole document as one block.
    SingleBlock(String),
    /// Extraction produced nothing usable.
    Unavailable,
}

impl SourceContent {
    /// Build content from an extractor result.
    ///
    /// `None`, an empty list, or a list whose entries are all blank becomes
    /// [`SourceContent::Unavailable`]. Non-paginated kinds with more than one
    /// block (DOCX paragraph groups, PPTX slides) are joined with newlines.
    pub fn from_extracted(kind: SourceKind, blocks: Option<Vec<String>>) -> Self {
        let blocks = match blocks {
            Some(b) if b.iter().any(|t| !t.trim().is_empty()) => b,
            _ => return SourceContent::Unavailable,
        };
        if kind.is_paginated() {
            SourceContent::Paginated(blocks)
        } else {
            let joined = blocks
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            SourceContent::SingleBlock(joined)
        }
    }

    /// Split a plain-text dump on form feeds (`\x0c`), the page delimiter
    /// `pdftotext` and most PDF text extractors emit.
    pub fn from_form_feed_text(text: &str) -> Self {
        let pages: Vec<String> = text
            .split('\u{000C}')
            .map(|p| p.to_string())
            .collect();
        // A trailing form feed leaves an empty final element that is not a page.
        let pages = match pages.split_last() {
            Some((last, rest)) if last.trim().is_empty() && !rest.is_empty() => rest.to_vec(),
            _ => pages,
        };
        Self::from_extracted(SourceKind::Pdf, Some(pages))
    }

    /// Number of chunks this content yields before page selection.
    pub fn chunk_count(&self) -> usize {
        match self {
            SourceContent::Paginated(pages) => pages.len(),
            SourceContent::SingleBlock(_) => 1,
            SourceContent::Unavailable => 0,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceContent::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kinds_case_insensitively() {
        assert_eq!("PDF".parse::<SourceKind>(), Ok(SourceKind::Pdf));
        assert_eq!("YouTube".parse::<SourceKind>(), Ok(SourceKind::Youtube));
        assert!("odt".parse::<SourceKind>().is_err());
    }

    #[test]
    fn pdf_keeps_blank_pages() {
        let c = SourceContent::from_extracted(
            SourceKind::Pdf,
            Some(vec!["one".into(), "".into(), "three".into()]),
        );
        assert_eq!(c.chunk_count(), 3);
    }

    #[test]
    fn non_pdf_is_joined_into_one_block() {
        let c = SourceContent::from_extracted(
            SourceKind::Pptx,
            Some(vec!["slide one".into(), " ".into(), "slide three".into()]),
        );
        assert_eq!(c, SourceContent::SingleBlock("slide one\nslide three".into()));
    }

    #[test]
    fn missing_or_blank_extraction_is_unavailable() {
        assert!(SourceContent::from_extracted(SourceKind::Txt, None).is_unavailable());
        assert!(SourceContent::from_extracted(SourceKind::Pdf, Some(vec![])).is_unavailable());
        assert!(
            SourceContent::from_extracted(SourceKind::Pdf, Some(vec!["  ".into(), "\n".into()]))
                .is_unavailable()
        );
    }

    #[test]
    fn form_feed_split_drops_trailing_delimiter() {
        let c = SourceContent::from_form_feed_text("page one\u{000C}page two\u{000C}");
        assert_eq!(
            c,
            SourceContent::Paginated(vec!["page one".into(), "page two".into()])
        );
    }
}
